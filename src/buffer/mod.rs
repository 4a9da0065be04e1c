//! Buffer management: frames, eviction policy, and the buffer pool.

mod buffer_pool_manager;
mod frame;
mod mem_store;
mod page_store;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use mem_store::MemStore;
pub use page_store::PageStore;
pub use stats::StatsSnapshot;
