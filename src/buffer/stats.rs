//! Buffer pool statistics.

use std::fmt;

/// Counters maintained inside the pool lock.
///
/// Everything that mutates these already holds the pool's mutex, so plain
/// `u64` fields suffice; [`StatsSnapshot`] is the copy handed to callers.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Stats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
}

impl Stats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            evictions: self.evictions,
            pages_read: self.pages_read,
            pages_written: self.pages_written,
        }
    }
}

/// A point-in-time snapshot of buffer pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
}

impl StatsSnapshot {
    /// Cache hit rate in `[0.0, 1.0]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, evictions: {}, hit_rate: {:.2}% }}",
            self.cache_hits,
            self.cache_misses,
            self.evictions,
            self.hit_rate() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let mut stats = Stats::default();
        stats.cache_hits = 7;
        stats.cache_misses = 3;

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hit_rate(), 0.7);
    }

    #[test]
    fn test_empty_hit_rate_is_zero() {
        assert_eq!(Stats::default().snapshot().hit_rate(), 0.0);
    }

    #[test]
    fn test_display() {
        let mut stats = Stats::default();
        stats.cache_hits = 80;
        stats.cache_misses = 20;
        stats.evictions = 5;

        let display = format!("{}", stats.snapshot());
        assert!(display.contains("hits: 80"));
        assert!(display.contains("80.00%"));
    }
}
