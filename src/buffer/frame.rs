//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds one resident [`Page`] plus the metadata the pool
//! needs: which page is loaded, the pin count, and the dirty flag.
//!
//! Frame metadata is only ever touched under the pool's single lock, so
//! the fields are plain values. The page bytes themselves sit behind an
//! `Arc<RwLock<Page>>` that `fetch_page`/`new_page` hand out to callers:
//! a pinned holder reads and writes the buffer without the pool lock, and
//! the pin count keeps the frame from being recycled underneath it.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::PageId;
use crate::storage::page::Page;

/// A frame in the buffer pool.
///
/// Lifecycle: free -> holding a page (pinned) -> unpinned-but-resident
/// (evictable) -> evicted (free again) or deleted.
pub struct Frame {
    /// The page bytes, shared with pinned callers.
    pub(crate) page: Arc<RwLock<Page>>,
    /// Which page is currently loaded, or None if the frame is free.
    pub(crate) page_id: Option<PageId>,
    /// Number of active holders of this frame's page.
    pub(crate) pin_count: u32,
    /// Whether the page content differs from its on-disk copy.
    pub(crate) is_dirty: bool,
}

impl Frame {
    /// Create a new free frame.
    pub fn new() -> Self {
        Self {
            page: Arc::new(RwLock::new(Page::new())),
            page_id: None,
            pin_count: 0,
            is_dirty: false,
        }
    }

    /// Check if the frame is currently pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    /// Check if the frame holds a page.
    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.page_id.is_some()
    }

    /// Return the frame to its free state, zeroing the page bytes.
    pub fn reset(&mut self) {
        self.page.write().reset();
        self.page_id = None;
        self.pin_count = 0;
        self.is_dirty = false;
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_free() {
        let frame = Frame::new();
        assert!(!frame.is_occupied());
        assert!(!frame.is_pinned());
        assert!(!frame.is_dirty);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut frame = Frame::new();
        frame.page_id = Some(PageId::new(9));
        frame.pin_count = 2;
        frame.is_dirty = true;
        frame.page.write().as_mut_slice()[100] = 0xFF;

        frame.reset();

        assert!(!frame.is_occupied());
        assert_eq!(frame.pin_count, 0);
        assert!(!frame.is_dirty);
        assert_eq!(frame.page.read().as_slice()[100], 0);
    }

    #[test]
    fn test_page_shared_with_holder() {
        let frame = Frame::new();
        let holder = Arc::clone(&frame.page);

        holder.write().as_mut_slice()[0] = 0xAB;
        assert_eq!(frame.page.read().as_slice()[0], 0xAB);
    }
}
