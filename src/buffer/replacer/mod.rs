//! Eviction policy implementations (replacers).
//!
//! - [`LruKReplacer`] - frequency-aware recency via backward K-distance

mod lru_k;

pub use lru_k::LruKReplacer;
