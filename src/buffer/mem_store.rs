//! Pure in-memory page provider.
//!
//! [`MemStore`] implements the same pin-count contract as the buffer pool
//! over a plain map, with no frames, no eviction, and no disk. It exists
//! as the lightweight swappable variant for driving the tree engine in
//! tests and in-memory workloads.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::buffer::page_store::PageStore;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

struct MemEntry {
    page: Arc<RwLock<Page>>,
    pin_count: u32,
}

#[derive(Default)]
struct MemInner {
    pages: HashMap<PageId, MemEntry>,
    next_page_id: u32,
}

/// An unbounded in-memory [`PageStore`].
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<MemInner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live pages.
    pub fn page_count(&self) -> usize {
        self.inner.lock().pages.len()
    }
}

impl PageStore for MemStore {
    fn fetch_page(&self, page_id: PageId) -> Result<Arc<RwLock<Page>>> {
        let mut inner = self.inner.lock();
        match inner.pages.get_mut(&page_id) {
            Some(entry) => {
                entry.pin_count += 1;
                Ok(Arc::clone(&entry.page))
            }
            None => Err(Error::PageNotResident(page_id.0)),
        }
    }

    fn new_page(&self) -> Result<(PageId, Arc<RwLock<Page>>)> {
        let mut inner = self.inner.lock();
        let page_id = PageId::new(inner.next_page_id);
        inner.next_page_id += 1;

        let page = Arc::new(RwLock::new(Page::new()));
        inner.pages.insert(
            page_id,
            MemEntry {
                page: Arc::clone(&page),
                pin_count: 1,
            },
        );
        Ok((page_id, page))
    }

    fn unpin_page(&self, page_id: PageId, _is_dirty: bool) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.pages.get_mut(&page_id) {
            Some(entry) => {
                if entry.pin_count == 0 {
                    return Err(Error::PageNotPinned(page_id.0));
                }
                entry.pin_count -= 1;
                Ok(())
            }
            None => Err(Error::PageNotResident(page_id.0)),
        }
    }

    fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock();
        match inner.pages.get(&page_id) {
            Some(entry) if entry.pin_count == 0 => {
                inner.pages.remove(&page_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn flush_page(&self, _page_id: PageId) -> Result<()> {
        Ok(())
    }

    fn flush_all_pages(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_ids_are_sequential() {
        let store = MemStore::new();
        let (pid0, _) = store.new_page().unwrap();
        let (pid1, _) = store.new_page().unwrap();
        assert_eq!(pid0, PageId::new(0));
        assert_eq!(pid1, PageId::new(1));
        assert_eq!(store.page_count(), 2);
    }

    #[test]
    fn test_fetch_returns_same_buffer() {
        let store = MemStore::new();
        let (pid, page) = store.new_page().unwrap();
        page.write().as_mut_slice()[0] = 0x42;
        store.unpin_page(pid, true).unwrap();

        let fetched = store.fetch_page(pid).unwrap();
        assert_eq!(fetched.read().as_slice()[0], 0x42);
        store.unpin_page(pid, false).unwrap();
    }

    #[test]
    fn test_fetch_unknown_page_fails() {
        let store = MemStore::new();
        assert!(matches!(
            store.fetch_page(PageId::new(7)),
            Err(Error::PageNotResident(7))
        ));
    }

    #[test]
    fn test_delete_honors_pin_count() {
        let store = MemStore::new();
        let (pid, _page) = store.new_page().unwrap();

        // Still pinned from new_page
        assert!(!store.delete_page(pid).unwrap());

        store.unpin_page(pid, false).unwrap();
        assert!(store.delete_page(pid).unwrap());
        assert!(!store.delete_page(pid).unwrap());
    }

    #[test]
    fn test_unpin_underflow_fails() {
        let store = MemStore::new();
        let (pid, _page) = store.new_page().unwrap();
        store.unpin_page(pid, false).unwrap();
        assert!(matches!(
            store.unpin_page(pid, false),
            Err(Error::PageNotPinned(_))
        ));
    }
}
