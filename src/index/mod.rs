//! Index structures built on the buffer pool.

mod btree;

pub use btree::BPlusTree;
