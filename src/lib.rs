//! BurrowDB - a disk-backed B+Tree storage engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          BurrowDB                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/)                    │   │
//! │  │    BPlusTree: search / insert / delete over pages    │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │                            ↓                                │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │            Buffer Pool (buffer/)                     │   │
//! │  │   BufferPoolManager + Frames + LRU-K eviction        │   │
//! │  │   (or MemStore, the in-memory PageStore for tests)   │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │                            ↓                                │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │            Storage Layer (storage/)                  │   │
//! │  │   DiskScheduler (one I/O worker) → DiskManager       │   │
//! │  │   Page formats: leaf / internal tree nodes           │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`storage`] - Disk I/O, the I/O scheduler, and page formats
//! - [`buffer`] - Buffer pool management and eviction
//! - [`index`] - The B+Tree engine
//!
//! # Quick Start
//! ```no_run
//! use burrowdb::buffer::BufferPoolManager;
//! use burrowdb::common::config::{DEFAULT_LRU_K, DEFAULT_POOL_SIZE};
//! use burrowdb::index::BPlusTree;
//! use burrowdb::storage::DiskManager;
//!
//! let dm = DiskManager::create("my_index.db").unwrap();
//! let pool = BufferPoolManager::new(DEFAULT_POOL_SIZE, DEFAULT_LRU_K, dm);
//!
//! let mut tree = BPlusTree::new(pool, 64).unwrap();
//! tree.insert(42, 420).unwrap();
//! assert_eq!(tree.get_value(42).unwrap(), Some(420));
//! tree.flush().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, PageId, Result};

pub use buffer::{BufferPoolManager, Frame, MemStore, PageStore, StatsSnapshot};
pub use index::BPlusTree;
pub use storage::page::{BTreePage, InternalPage, LeafPage, Page};
pub use storage::{DiskManager, DiskScheduler};
