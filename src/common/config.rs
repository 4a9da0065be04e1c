//! Configuration constants for burrowdb.

/// Size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems and keeps page offsets
/// computable as `page_id * PAGE_SIZE`.
pub const PAGE_SIZE: usize = 4096;

/// Default number of frames in the buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Default K for the LRU-K replacer.
pub const DEFAULT_LRU_K: usize = 2;
