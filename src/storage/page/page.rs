//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is a raw 4KB byte array that serves as the unit of I/O
//! between disk and memory. Pages are held in buffer pool frames; the
//! typed B+Tree node layouts decode from and encode into this buffer.

use crate::common::config::PAGE_SIZE;

/// A page of data (4KB, 4KB-aligned).
///
/// # Memory Layout
/// - Size: 4096 bytes (4KB)
/// - Alignment: 4096 bytes (for efficient Direct I/O)
///
/// `Page` does not implement `Clone` in production code; copying 4KB is
/// expensive and should be explicit via [`Page::copy_from`]. A
/// `#[cfg(test)]` Clone is provided for tests.
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Overwrite this page with the contents of another.
    #[inline]
    pub fn copy_from(&mut self, other: &Page) {
        self.data.copy_from_slice(&other.data);
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}
