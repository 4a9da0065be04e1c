//! Page identifier type.

use std::fmt;

/// Identifies a page on disk.
///
/// Page N lives at file offset `N * PAGE_SIZE`. With `u32` ids and 4KB
/// pages the addressable file size tops out at 16TB.
///
/// # Example
/// ```
/// use burrowdb::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID, used for "no page".
    ///
    /// On the wire this encodes as -1 (the leaf sibling link of the
    /// rightmost leaf, for example).
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Decode from the on-disk i32 representation (-1 means "none").
    #[inline]
    pub fn from_wire(raw: i32) -> Option<PageId> {
        if raw < 0 {
            None
        } else {
            Some(PageId(raw as u32))
        }
    }

    /// Encode an optional page id as the on-disk i32 (-1 means "none").
    #[inline]
    pub fn to_wire(id: Option<PageId>) -> i32 {
        match id {
            Some(pid) => pid.0 as i32,
            None => -1,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
