//! Page types and layouts.
//!
//! This module contains:
//! - [`Page`] - The raw 4KB data container
//! - [`BTreePage`] / [`BTreePageKind`] - Tree node discriminator and decode dispatch
//! - [`LeafPage`] / [`InternalPage`] - Typed B+Tree node layouts

mod btree_page;
mod internal_page;
mod leaf_page;
#[allow(clippy::module_inception)]
mod page;

pub use btree_page::{BTreePage, BTreePageKind};
pub use internal_page::InternalPage;
pub use leaf_page::LeafPage;
pub use page::Page;
