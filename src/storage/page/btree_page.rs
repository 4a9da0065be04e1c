//! Common B+Tree node layer: type discriminator and decode dispatch.
//!
//! Every tree page starts with the same header fields, encoded as
//! big-endian 32-bit integers:
//! ```text
//! Offset  Field
//! ------  -----
//! 0       page type (1 = leaf, 2 = internal)
//! 4       page id
//! 8       size (# valid keys)
//! 12      max size (capacity)
//! ```
//! Leaf and internal pages lay out their payload after this header; see
//! [`LeafPage`] and [`InternalPage`] for the exact formats.

use crate::common::{Error, PageId, Result};
use crate::storage::page::{InternalPage, LeafPage, Page};

/// On-disk type tag of a tree page (first 4 bytes of every page).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum BTreePageKind {
    Leaf = 1,
    Internal = 2,
}

/// A decoded B+Tree node.
///
/// Tree pages are decoded out of a raw [`Page`] into an owned typed value,
/// mutated through typed accessors, and encoded back before unpinning.
pub enum BTreePage {
    Leaf(LeafPage),
    Internal(InternalPage),
}

impl BTreePage {
    /// Decode a tree node from a raw page, dispatching on the type tag.
    ///
    /// # Errors
    /// `Error::Corrupted` if the tag is neither leaf nor internal, or if
    /// the node's declared sizes are inconsistent.
    pub fn decode(page: &Page) -> Result<BTreePage> {
        let buf = page.as_slice();
        match read_i32(buf, 0) {
            t if t == BTreePageKind::Leaf as i32 => Ok(BTreePage::Leaf(LeafPage::decode(buf)?)),
            t if t == BTreePageKind::Internal as i32 => {
                Ok(BTreePage::Internal(InternalPage::decode(buf)?))
            }
            tag => Err(Error::Corrupted(format!(
                "unknown tree page type tag {tag}"
            ))),
        }
    }

    /// Encode this node into a raw page buffer.
    pub fn encode(&self, page: &mut Page) {
        match self {
            BTreePage::Leaf(leaf) => leaf.encode(page),
            BTreePage::Internal(internal) => internal.encode(page),
        }
    }

    pub fn page_id(&self) -> PageId {
        match self {
            BTreePage::Leaf(leaf) => leaf.page_id(),
            BTreePage::Internal(internal) => internal.page_id(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            BTreePage::Leaf(leaf) => leaf.size(),
            BTreePage::Internal(internal) => internal.size(),
        }
    }

    pub fn max_size(&self) -> usize {
        match self {
            BTreePage::Leaf(leaf) => leaf.max_size(),
            BTreePage::Internal(internal) => internal.max_size(),
        }
    }

    /// Minimum key count of a non-root node: `ceil(max_size / 2)`.
    pub fn min_size(&self) -> usize {
        (self.max_size() + 1) / 2
    }

    pub fn kind(&self) -> BTreePageKind {
        match self {
            BTreePage::Leaf(_) => BTreePageKind::Leaf,
            BTreePage::Internal(_) => BTreePageKind::Internal,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BTreePage::Leaf(_))
    }
}

/// Read a big-endian i32 at `pos`.
#[inline]
pub(crate) fn read_i32(buf: &[u8], pos: usize) -> i32 {
    i32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

/// Write a big-endian i32 at `pos`.
#[inline]
pub(crate) fn write_i32(buf: &mut [u8], pos: usize, value: i32) {
    buf[pos..pos + 4].copy_from_slice(&value.to_be_bytes());
}
