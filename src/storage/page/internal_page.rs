//! Internal node layout and structural operations.
//!
//! # Wire format (big-endian i32 fields)
//! ```text
//! Offset             Field
//! ------             -----
//! 0                  page type = 2
//! 4                  page id
//! 8                  size (# keys)
//! 12                 max size
//! 16 + i*4           key[i+1]            (size keys, logical indices 1..=size)
//! 16 + size*4 + i*4  child[i]            (size+1 children, indices 0..=size)
//! ```
//! Logical key index 0 is an unused sentinel covering minus infinity: the
//! child at index `i` holds keys `>= key(i)` and `< key(i+1)`. Child page
//! ids are pairwise distinct.

use std::collections::HashSet;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::btree_page::{read_i32, write_i32};
use crate::storage::page::Page;

const HEADER_SIZE: usize = 16;

/// A decoded B+Tree internal node: separator keys and child page ids.
pub struct InternalPage {
    page_id: PageId,
    max_size: usize,
    /// `keys[i]` is the logical key at index `i + 1`.
    keys: Vec<i32>,
    /// One more child than keys once initialized.
    children: Vec<PageId>,
}

impl InternalPage {
    /// Create a root internal node with one separator key and two children.
    ///
    /// # Panics
    /// Panics if `max_size` keys and children would not fit in a page.
    pub fn new_root(
        page_id: PageId,
        max_size: usize,
        key: i32,
        left_child: PageId,
        right_child: PageId,
    ) -> Self {
        assert!(max_size >= 2, "internal max_size must be at least 2");
        assert!(
            HEADER_SIZE + max_size * 4 + (max_size + 1) * 4 <= PAGE_SIZE,
            "internal max_size {max_size} does not fit in a page"
        );
        Self {
            page_id,
            max_size,
            keys: vec![key],
            children: vec![left_child, right_child],
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Number of valid keys (one less than the number of children).
    pub fn size(&self) -> usize {
        self.keys.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Minimum key count of a non-root internal node: `ceil(max_size / 2)`.
    pub fn min_size(&self) -> usize {
        (self.max_size + 1) / 2
    }

    pub fn is_full(&self) -> bool {
        self.keys.len() >= self.max_size
    }

    /// Key at logical index `i` (1-based; index 0 is the sentinel).
    pub fn key_at(&self, index: usize) -> i32 {
        self.keys[index - 1]
    }

    pub fn set_key_at(&mut self, index: usize, key: i32) {
        self.keys[index - 1] = key;
    }

    /// Child page id at index `i` (0-based, `0..=size`).
    pub fn child_at(&self, index: usize) -> PageId {
        self.children[index]
    }

    /// Position of `child` among this node's children, if present.
    pub fn child_index(&self, child: PageId) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Choose the child to descend into for `key`: the index `i` with
    /// `key(i) <= key < key(i+1)`, where key index 0 covers minus
    /// infinity.
    pub fn search_child(&self, key: i32) -> usize {
        self.keys.partition_point(|&k| k <= key)
    }

    /// Insert a separator key with its right child, keeping key order.
    ///
    /// Returns false without mutating if the node is already at capacity;
    /// the caller must split first.
    pub fn insert_entry(&mut self, key: i32, right_child: PageId) -> bool {
        if self.is_full() {
            return false;
        }
        let pos = self.keys.partition_point(|&k| k < key);
        self.keys.insert(pos, key);
        self.children.insert(pos + 1, right_child);
        true
    }

    /// Remove the key at logical index `i` and the child at index `i`
    /// (the subtree to the key's right), shifting later entries left.
    ///
    /// Returns false if the index is out of range.
    pub fn remove_entry(&mut self, index: usize) -> bool {
        if index < 1 || index > self.keys.len() {
            return false;
        }
        self.keys.remove(index - 1);
        self.children.remove(index);
        true
    }

    /// Split at the midpoint. The midpoint key is promoted to the parent
    /// (not copied into either half); keys after it and children from the
    /// midpoint onward move to the new node.
    ///
    /// Returns `(promoted_key, new_right_node)`.
    ///
    /// # Panics
    /// Panics if the node has fewer than two keys.
    pub fn split(&mut self, new_page_id: PageId) -> (i32, InternalPage) {
        let size = self.keys.len();
        assert!(size >= 2, "split of internal node with fewer than two keys");
        let mid = size / 2;

        let promoted = self.keys[mid - 1];
        let right_keys = self.keys.split_off(mid);
        let right_children = self.children.split_off(mid);
        self.keys.truncate(mid - 1);

        let right = InternalPage {
            page_id: new_page_id,
            max_size: self.max_size,
            keys: right_keys,
            children: right_children,
        };
        (promoted, right)
    }

    /// Append a key/child pair at the right end (borrow from the right
    /// sibling: the key is the old parent separator, the child is the
    /// sibling's former first child).
    pub fn push_back(&mut self, key: i32, child: PageId) {
        self.keys.push(key);
        self.children.push(child);
    }

    /// Prepend a key/child pair at the left end (borrow from the left
    /// sibling: the key is the old parent separator, the child is the
    /// sibling's former last child).
    pub fn push_front(&mut self, key: i32, child: PageId) {
        self.keys.insert(0, key);
        self.children.insert(0, child);
    }

    /// Remove and return the first key and first child.
    pub fn pop_front(&mut self) -> (i32, PageId) {
        (self.keys.remove(0), self.children.remove(0))
    }

    /// Remove and return the last key and last child.
    ///
    /// # Panics
    /// Panics on an empty node.
    pub fn pop_back(&mut self) -> (i32, PageId) {
        match (self.keys.pop(), self.children.pop()) {
            (Some(key), Some(child)) => (key, child),
            _ => panic!("pop_back on empty internal node {}", self.page_id),
        }
    }

    /// Merge a right-hand sibling into this node, pulling the parent's
    /// separator key down between the two halves.
    pub fn absorb_right(&mut self, separator: i32, right: InternalPage) {
        self.keys.push(separator);
        self.keys.extend(right.keys);
        self.children.extend(right.children);
    }

    /// Check the pairwise-distinct child pointer invariant.
    pub fn children_distinct(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.children.len());
        self.children.iter().all(|&c| seen.insert(c))
    }

    /// Encode into a raw page buffer (trailing bytes zeroed).
    pub fn encode(&self, page: &mut Page) {
        page.reset();
        let buf = page.as_mut_slice();
        let size = self.keys.len();
        write_i32(buf, 0, 2);
        write_i32(buf, 4, self.page_id.0 as i32);
        write_i32(buf, 8, size as i32);
        write_i32(buf, 12, self.max_size as i32);

        for (i, &key) in self.keys.iter().enumerate() {
            write_i32(buf, HEADER_SIZE + i * 4, key);
        }
        let children_base = HEADER_SIZE + size * 4;
        for (i, &child) in self.children.iter().enumerate() {
            write_i32(buf, children_base + i * 4, child.0 as i32);
        }
    }

    /// Decode from a raw page buffer; the caller has already checked the
    /// type tag.
    pub fn decode(buf: &[u8]) -> Result<InternalPage> {
        let page_id = read_i32(buf, 4);
        let size = read_i32(buf, 8);
        let max_size = read_i32(buf, 12);

        if page_id < 0 || size < 1 || max_size < 2 || size > max_size {
            return Err(Error::Corrupted(format!(
                "internal page header out of range: id={page_id} size={size} max={max_size}"
            )));
        }
        let (size, max_size) = (size as usize, max_size as usize);
        if HEADER_SIZE + max_size * 4 + (max_size + 1) * 4 > PAGE_SIZE {
            return Err(Error::Corrupted(format!(
                "internal max_size {max_size} does not fit in a page"
            )));
        }

        let mut keys = Vec::with_capacity(max_size);
        for i in 0..size {
            keys.push(read_i32(buf, HEADER_SIZE + i * 4));
        }
        let children_base = HEADER_SIZE + size * 4;
        let mut children = Vec::with_capacity(max_size + 1);
        for i in 0..=size {
            let raw = read_i32(buf, children_base + i * 4);
            match PageId::from_wire(raw) {
                Some(child) => children.push(child),
                None => {
                    return Err(Error::Corrupted(format!(
                        "internal page {page_id} has invalid child id {raw}"
                    )))
                }
            }
        }

        Ok(InternalPage {
            page_id: PageId::new(page_id as u32),
            max_size,
            keys,
            children,
        })
    }
}
