//! LRU-K replacement policy.
//!
//! Tracks the last K access timestamps per frame. Frames that have not yet
//! accumulated K accesses are evicted first (coldest first access wins);
//! among fully-observed frames the victim is the one whose K-th most recent
//! access lies furthest in the past. This protects frames that are touched
//! often even when each individual touch is old, while rarely-seen frames
//! are evicted promptly on pure recency.

use std::collections::{HashMap, VecDeque};

use crate::common::FrameId;

struct LruKNode {
    /// The most recent K access timestamps, oldest first.
    history: VecDeque<u64>,
    /// Earliest-ever access, used as the cold-start tie-break.
    first_access: u64,
    evictable: bool,
}

/// An LRU-K eviction policy over buffer pool frames.
///
/// All methods take `&mut self`; the buffer pool serializes access under
/// its pool lock.
pub struct LruKReplacer {
    k: usize,
    nodes: HashMap<FrameId, LruKNode>,
    /// Monotonic logical clock, advanced on every recorded access.
    timestamp: u64,
    /// Number of frames currently marked evictable.
    evictable_count: usize,
}

impl LruKReplacer {
    /// Create a replacer with the given K.
    ///
    /// # Panics
    /// Panics if `k` is 0.
    pub fn new(k: usize) -> Self {
        assert!(k > 0, "LRU-K requires k > 0");
        Self {
            k,
            nodes: HashMap::new(),
            timestamp: 0,
            evictable_count: 0,
        }
    }

    /// Record an access to a frame, trimming history to the last K entries.
    pub fn record_access(&mut self, frame_id: FrameId) {
        self.timestamp += 1;
        let now = self.timestamp;

        let node = self.nodes.entry(frame_id).or_insert_with(|| LruKNode {
            history: VecDeque::with_capacity(self.k + 1),
            first_access: now,
            evictable: false,
        });
        node.history.push_back(now);
        if node.history.len() > self.k {
            node.history.pop_front();
        }
    }

    /// Toggle whether a frame is a candidate for eviction.
    ///
    /// Unknown frames are ignored; the pool records an access before the
    /// first toggle.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if let Some(node) = self.nodes.get_mut(&frame_id) {
            if node.evictable != evictable {
                node.evictable = evictable;
                if evictable {
                    self.evictable_count += 1;
                } else {
                    self.evictable_count -= 1;
                }
            }
        }
    }

    /// Select a victim among evictable frames and drop its bookkeeping.
    ///
    /// Frames with fewer than K recorded accesses take priority, earliest
    /// first access first; otherwise the frame with the largest backward
    /// K-distance (`now - k-th most recent access`) wins. Returns `None`
    /// if no frame is evictable.
    pub fn evict(&mut self) -> Option<FrameId> {
        let now = self.timestamp;

        let mut cold_victim: Option<(FrameId, u64)> = None;
        let mut kth_victim: Option<(FrameId, u64)> = None;

        for (&frame_id, node) in &self.nodes {
            if !node.evictable {
                continue;
            }

            if node.history.len() < self.k {
                let better = match cold_victim {
                    Some((_, oldest)) => node.first_access < oldest,
                    None => true,
                };
                if better {
                    cold_victim = Some((frame_id, node.first_access));
                }
            } else if cold_victim.is_none() {
                // history holds exactly k entries; front is the k-th most recent
                let distance = now - node.history[0];
                let better = match kth_victim {
                    Some((_, best)) => distance > best,
                    None => true,
                };
                if better {
                    kth_victim = Some((frame_id, distance));
                }
            }
        }

        let victim = cold_victim.or(kth_victim).map(|(frame_id, _)| frame_id)?;
        self.remove(victim);
        Some(victim)
    }

    /// Drop all bookkeeping for a frame unconditionally.
    ///
    /// Used when a page is explicitly deleted from the pool.
    pub fn remove(&mut self, frame_id: FrameId) {
        if let Some(node) = self.nodes.remove(&frame_id) {
            if node.evictable {
                self.evictable_count -= 1;
            }
        }
    }

    /// Number of currently evictable frames.
    pub fn size(&self) -> usize {
        self.evictable_count
    }
}
