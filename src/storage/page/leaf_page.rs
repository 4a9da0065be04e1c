//! Leaf node layout and structural operations.
//!
//! # Wire format (big-endian i32 fields)
//! ```text
//! Offset       Field
//! ------       -----
//! 0            page type = 1
//! 4            page id
//! 8            size (# entries)
//! 12           max size
//! 16           next page id (-1 if none)
//! 20 + i*8     key[i]
//! 24 + i*8     value[i]
//! ```
//! Entries are sorted by key ascending. Leaves form a singly linked list
//! left-to-right through `next_page_id`.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::btree_page::{read_i32, write_i32};
use crate::storage::page::Page;

const HEADER_SIZE: usize = 20;
const ENTRY_SIZE: usize = 8;

/// A decoded B+Tree leaf node: sorted `(key, value)` pairs plus the
/// sibling link.
pub struct LeafPage {
    page_id: PageId,
    max_size: usize,
    next_page_id: Option<PageId>,
    entries: Vec<(i32, i32)>,
}

impl LeafPage {
    /// Create an empty leaf.
    ///
    /// # Panics
    /// Panics if `max_size` entries would not fit in a page.
    pub fn new(page_id: PageId, max_size: usize) -> Self {
        assert!(max_size >= 2, "leaf max_size must be at least 2");
        assert!(
            HEADER_SIZE + max_size * ENTRY_SIZE <= PAGE_SIZE,
            "leaf max_size {max_size} does not fit in a page"
        );
        Self {
            page_id,
            max_size,
            next_page_id: None,
            entries: Vec::with_capacity(max_size),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Minimum entry count of a non-root leaf: `ceil(max_size / 2)`.
    pub fn min_size(&self) -> usize {
        (self.max_size + 1) / 2
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_size
    }

    pub fn next_page_id(&self) -> Option<PageId> {
        self.next_page_id
    }

    pub fn set_next_page_id(&mut self, next: Option<PageId>) {
        self.next_page_id = next;
    }

    pub fn key_at(&self, index: usize) -> i32 {
        self.entries[index].0
    }

    pub fn value_at(&self, index: usize) -> i32 {
        self.entries[index].1
    }

    pub fn contains_key(&self, key: i32) -> bool {
        self.entries.binary_search_by_key(&key, |&(k, _)| k).is_ok()
    }

    /// Point lookup by exact key.
    pub fn lookup(&self, key: i32) -> Option<i32> {
        self.entries
            .binary_search_by_key(&key, |&(k, _)| k)
            .ok()
            .map(|i| self.entries[i].1)
    }

    /// Shift-insert keeping ascending key order.
    ///
    /// Duplicate keys are rejected upstream by the tree, not here.
    ///
    /// # Panics
    /// Panics if the leaf is already at capacity; the tree must split
    /// before inserting into a full leaf.
    pub fn insert(&mut self, key: i32, value: i32) {
        assert!(!self.is_full(), "insert into full leaf page");
        let pos = self.entries.partition_point(|&(k, _)| k < key);
        self.entries.insert(pos, (key, value));
    }

    /// Remove the entry with `key`, shifting later entries left.
    ///
    /// Returns false if the key is absent.
    pub fn remove(&mut self, key: i32) -> bool {
        match self.entries.binary_search_by_key(&key, |&(k, _)| k) {
            Ok(pos) => {
                self.entries.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Move the upper half of this leaf into a new leaf.
    ///
    /// The lower half (`0..size/2`) stays; the new leaf takes the rest,
    /// inherits this leaf's successor, and this leaf links to the new
    /// leaf.
    pub fn split(&mut self, new_page_id: PageId) -> LeafPage {
        let mid = self.entries.len() / 2;

        let mut new_leaf = LeafPage::new(new_page_id, self.max_size);
        new_leaf.entries = self.entries.split_off(mid);
        new_leaf.next_page_id = self.next_page_id;
        self.next_page_id = Some(new_page_id);

        new_leaf
    }

    /// Remove and return the first entry (used when a right sibling lends
    /// to an underflowed leaf).
    pub fn take_first(&mut self) -> (i32, i32) {
        self.entries.remove(0)
    }

    /// Remove and return the last entry (used when a left sibling lends
    /// to an underflowed leaf).
    pub fn take_last(&mut self) -> (i32, i32) {
        self.entries
            .pop()
            .unwrap_or_else(|| panic!("take_last on empty leaf {}", self.page_id))
    }

    /// Concatenate a right-hand sibling's entries into this leaf and take
    /// over its successor link.
    pub fn absorb_right(&mut self, right: LeafPage) {
        self.entries.extend(right.entries);
        self.next_page_id = right.next_page_id;
    }

    /// Encode into a raw page buffer (trailing bytes zeroed).
    pub fn encode(&self, page: &mut Page) {
        page.reset();
        let buf = page.as_mut_slice();
        write_i32(buf, 0, 1);
        write_i32(buf, 4, self.page_id.0 as i32);
        write_i32(buf, 8, self.entries.len() as i32);
        write_i32(buf, 12, self.max_size as i32);
        write_i32(buf, 16, PageId::to_wire(self.next_page_id));

        for (i, &(key, value)) in self.entries.iter().enumerate() {
            write_i32(buf, HEADER_SIZE + i * ENTRY_SIZE, key);
            write_i32(buf, HEADER_SIZE + i * ENTRY_SIZE + 4, value);
        }
    }

    /// Decode from a raw page buffer; the caller has already checked the
    /// type tag.
    pub fn decode(buf: &[u8]) -> Result<LeafPage> {
        let page_id = read_i32(buf, 4);
        let size = read_i32(buf, 8);
        let max_size = read_i32(buf, 12);
        let next = read_i32(buf, 16);

        if page_id < 0 || size < 0 || max_size < 2 || size > max_size {
            return Err(Error::Corrupted(format!(
                "leaf page header out of range: id={page_id} size={size} max={max_size}"
            )));
        }
        let (size, max_size) = (size as usize, max_size as usize);
        if HEADER_SIZE + max_size * ENTRY_SIZE > PAGE_SIZE {
            return Err(Error::Corrupted(format!(
                "leaf max_size {max_size} does not fit in a page"
            )));
        }

        let mut leaf = LeafPage::new(PageId::new(page_id as u32), max_size);
        leaf.next_page_id = PageId::from_wire(next);
        for i in 0..size {
            let key = read_i32(buf, HEADER_SIZE + i * ENTRY_SIZE);
            let value = read_i32(buf, HEADER_SIZE + i * ENTRY_SIZE + 4);
            leaf.entries.push((key, value));
        }
        Ok(leaf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_with(keys: &[i32]) -> LeafPage {
        let mut leaf = LeafPage::new(PageId::new(1), 8);
        for &k in keys {
            leaf.insert(k, k * 10);
        }
        leaf
    }

    #[test]
    fn test_insert_keeps_order() {
        let leaf = leaf_with(&[30, 10, 20]);
        assert_eq!(leaf.size(), 3);
        assert_eq!(leaf.key_at(0), 10);
        assert_eq!(leaf.key_at(1), 20);
        assert_eq!(leaf.key_at(2), 30);
        assert_eq!(leaf.value_at(1), 200);
    }

    #[test]
    fn test_lookup_and_contains() {
        let leaf = leaf_with(&[5, 15, 25]);
        assert!(leaf.contains_key(15));
        assert_eq!(leaf.lookup(15), Some(150));
        assert_eq!(leaf.lookup(16), None);
    }

    #[test]
    fn test_remove() {
        let mut leaf = leaf_with(&[1, 2, 3]);
        assert!(leaf.remove(2));
        assert!(!leaf.remove(2));
        assert_eq!(leaf.size(), 2);
        assert_eq!(leaf.key_at(0), 1);
        assert_eq!(leaf.key_at(1), 3);
    }

    #[test]
    fn test_split_moves_upper_half_and_relinks() {
        let mut leaf = leaf_with(&[10, 20, 30, 40]);
        leaf.set_next_page_id(Some(PageId::new(9)));

        let new_leaf = leaf.split(PageId::new(2));

        assert_eq!(leaf.size(), 2);
        assert_eq!(leaf.key_at(0), 10);
        assert_eq!(leaf.key_at(1), 20);
        assert_eq!(leaf.next_page_id(), Some(PageId::new(2)));

        assert_eq!(new_leaf.size(), 2);
        assert_eq!(new_leaf.key_at(0), 30);
        assert_eq!(new_leaf.key_at(1), 40);
        assert_eq!(new_leaf.next_page_id(), Some(PageId::new(9)));
    }

    #[test]
    fn test_absorb_right() {
        let mut left = leaf_with(&[1, 2]);
        let mut right = LeafPage::new(PageId::new(2), 8);
        right.insert(3, 30);
        right.insert(4, 40);
        right.set_next_page_id(Some(PageId::new(7)));

        left.absorb_right(right);

        assert_eq!(left.size(), 4);
        assert_eq!(left.key_at(3), 4);
        assert_eq!(left.next_page_id(), Some(PageId::new(7)));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut leaf = leaf_with(&[100, 70, 10]);
        leaf.set_next_page_id(Some(PageId::new(5)));

        let mut page = Page::new();
        leaf.encode(&mut page);

        // Exact header layout: type, id, size, max, next
        let buf = page.as_slice();
        assert_eq!(read_i32(buf, 0), 1);
        assert_eq!(read_i32(buf, 4), 1);
        assert_eq!(read_i32(buf, 8), 3);
        assert_eq!(read_i32(buf, 12), 8);
        assert_eq!(read_i32(buf, 16), 5);

        let decoded = LeafPage::decode(buf).unwrap();
        assert_eq!(decoded.page_id(), PageId::new(1));
        assert_eq!(decoded.size(), 3);
        assert_eq!(decoded.key_at(0), 10);
        assert_eq!(decoded.key_at(2), 100);
        assert_eq!(decoded.next_page_id(), Some(PageId::new(5)));
    }

    #[test]
    fn test_decode_rejects_bad_header() {
        let mut page = Page::new();
        let leaf = leaf_with(&[1]);
        leaf.encode(&mut page);

        // Corrupt the size field to exceed max_size
        write_i32(page.as_mut_slice(), 8, 100);
        assert!(matches!(
            LeafPage::decode(page.as_slice()),
            Err(Error::Corrupted(_))
        ));
    }

    #[test]
    fn test_next_pointer_none_encodes_minus_one() {
        let leaf = leaf_with(&[]);
        let mut page = Page::new();
        leaf.encode(&mut page);
        assert_eq!(read_i32(page.as_slice(), 16), -1);
    }
}
