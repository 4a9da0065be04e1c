//! The page-provider capability consumed by the index layer.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{PageId, Result};
use crate::storage::page::Page;

/// Provider of pinned page buffers.
///
/// The tree engine is written against this capability so the disk-backed
/// [`BufferPoolManager`] and the pure in-memory [`MemStore`] are
/// interchangeable. The contract is pin-based: `fetch_page`/`new_page`
/// pin a page and hand out its buffer; the caller owns the buffer's
/// content until the matching `unpin_page`, whose dirty flag is the sole
/// trigger for write-back.
///
/// [`BufferPoolManager`]: crate::buffer::BufferPoolManager
/// [`MemStore`]: crate::buffer::MemStore
pub trait PageStore {
    /// Pin a page and return its buffer.
    fn fetch_page(&self, page_id: PageId) -> Result<Arc<RwLock<Page>>>;

    /// Allocate a fresh page id and return its zeroed, pinned buffer.
    fn new_page(&self) -> Result<(PageId, Arc<RwLock<Page>>)>;

    /// Release one pin, merging the dirty flag.
    ///
    /// # Errors
    /// `Error::PageNotResident` if the page is not resident;
    /// `Error::PageNotPinned` if its pin count is already zero.
    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<()>;

    /// Drop a page. Returns `Ok(false)` if the page is still pinned or
    /// not resident; never an error for those cases.
    fn delete_page(&self, page_id: PageId) -> Result<bool>;

    /// Write one page back if dirty.
    fn flush_page(&self, page_id: PageId) -> Result<()>;

    /// Write every resident dirty page back (durability checkpoint).
    fn flush_all_pages(&self) -> Result<()>;
}
