//! Disk-backed B+Tree over a [`PageStore`].
//!
//! The tree holds only the current root page id; every node lives in a
//! page and is reached through child page ids stored in internal nodes.
//! All leaves sit at equal depth, and every non-root node keeps at least
//! `ceil(max_size / 2)` keys outside the middle of an operation.
//!
//! Nodes are decoded out of their raw page into typed values, mutated,
//! and encoded back before the page is unpinned, so no page stays pinned
//! across operations. Descent for insert/delete records the internal
//! nodes it passes in an ancestor stack; there are no parent pointers.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::buffer::PageStore;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{BTreePage, InternalPage, LeafPage};

/// A B+Tree index mapping `i32` keys to `i32` values.
///
/// Generic over the page store so the same engine runs against the
/// buffer pool or an in-memory store in tests.
pub struct BPlusTree<S: PageStore> {
    store: S,
    root_page_id: PageId,
    max_size: usize,
}

impl<S: PageStore> BPlusTree<S> {
    /// Create a fresh tree: allocates an empty leaf as the root.
    pub fn new(store: S, max_size: usize) -> Result<Self> {
        let (root_page_id, page) = store.new_page()?;
        let root = LeafPage::new(root_page_id, max_size);
        root.encode(&mut page.write());
        store.unpin_page(root_page_id, true)?;

        Ok(Self {
            store,
            root_page_id,
            max_size,
        })
    }

    /// Re-attach to an existing tree rooted at `root_page_id`.
    ///
    /// The node capacity is read back from the root page.
    pub fn open(store: S, root_page_id: PageId) -> Result<Self> {
        let page = store.fetch_page(root_page_id)?;
        let decoded = BTreePage::decode(&page.read());
        store.unpin_page(root_page_id, false)?;

        Ok(Self {
            store,
            root_page_id,
            max_size: decoded?.max_size(),
        })
    }

    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    /// Point the tree at a different root (used when reloading state the
    /// caller persisted out of band).
    pub fn set_root_page_id(&mut self, root_page_id: PageId) {
        self.root_page_id = root_page_id;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Look up the value stored under `key`.
    pub fn get_value(&self, key: i32) -> Result<Option<i32>> {
        let (leaf, _) = self.find_leaf(key, false)?;
        Ok(leaf.lookup(key))
    }

    /// Insert a key/value pair. Returns false if the key already exists.
    pub fn insert(&mut self, key: i32, value: i32) -> Result<bool> {
        let (mut leaf, ancestors) = self.find_leaf(key, true)?;
        if leaf.contains_key(key) {
            return Ok(false);
        }

        if !leaf.is_full() {
            leaf.insert(key, value);
            self.write_leaf(&leaf)?;
            return Ok(true);
        }

        // Full leaf: split, then place the new entry in whichever half
        // covers it. The new leaf's first key becomes the separator.
        let (new_id, new_page) = self.store.new_page()?;
        let mut new_leaf = leaf.split(new_id);
        let separator = new_leaf.key_at(0);
        if key < separator {
            leaf.insert(key, value);
        } else {
            new_leaf.insert(key, value);
        }

        self.write_leaf(&leaf)?;
        new_leaf.encode(&mut new_page.write());
        self.store.unpin_page(new_id, true)?;

        self.insert_into_parent(leaf.page_id(), separator, new_id, ancestors)?;
        Ok(true)
    }

    /// Remove `key`. Returns false if the key is absent.
    pub fn remove(&mut self, key: i32) -> Result<bool> {
        let (mut leaf, ancestors) = self.find_leaf(key, true)?;
        if !leaf.remove(key) {
            return Ok(false);
        }
        self.write_leaf(&leaf)?;

        // The root leaf tolerates any occupancy, down to empty.
        if !ancestors.is_empty() && leaf.size() < leaf.min_size() {
            self.handle_leaf_underflow(leaf, ancestors)?;
        }
        Ok(true)
    }

    /// All keys in ascending order, walking the leaf chain from the
    /// leftmost leaf.
    ///
    /// # Errors
    /// `Error::Corrupted` if the leaf chain revisits a page id; a
    /// well-formed tree never cycles.
    pub fn all_keys(&self) -> Result<Vec<i32>> {
        let mut current = self.root_page_id;
        let mut leaf = loop {
            match self.read_node(current)? {
                BTreePage::Leaf(leaf) => break leaf,
                BTreePage::Internal(node) => current = node.child_at(0),
            }
        };

        let mut keys = Vec::new();
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(leaf.page_id()) {
                return Err(Error::Corrupted(format!(
                    "leaf chain cycles back to {}",
                    leaf.page_id()
                )));
            }
            for i in 0..leaf.size() {
                keys.push(leaf.key_at(i));
            }
            match leaf.next_page_id() {
                Some(next) => leaf = self.read_leaf(next)?,
                None => return Ok(keys),
            }
        }
    }

    /// Render the tree level by level, one line per level. Diagnostic
    /// output for tests and debugging.
    pub fn dump(&self) -> Result<String> {
        let mut out = String::new();
        let mut visited = HashSet::new();
        let mut level = vec![self.root_page_id];
        let mut depth = 0;

        while !level.is_empty() {
            let mut next_level = Vec::new();
            let _ = write!(out, "L{depth}:");
            for page_id in level {
                if !visited.insert(page_id) {
                    return Err(Error::Corrupted(format!(
                        "tree structure revisits {page_id}"
                    )));
                }
                match self.read_node(page_id)? {
                    BTreePage::Leaf(leaf) => {
                        let _ = write!(out, " [{}:", page_id.0);
                        for i in 0..leaf.size() {
                            let _ = write!(out, " {}={}", leaf.key_at(i), leaf.value_at(i));
                        }
                        out.push_str(" ]");
                    }
                    BTreePage::Internal(node) => {
                        let _ = write!(out, " ({}:", page_id.0);
                        for i in 1..=node.size() {
                            let _ = write!(out, " {}", node.key_at(i));
                        }
                        out.push_str(" )");
                        for i in 0..=node.size() {
                            next_level.push(node.child_at(i));
                        }
                    }
                }
            }
            out.push('\n');
            level = next_level;
            depth += 1;
        }
        Ok(out)
    }

    /// Push every dirty page to disk.
    pub fn flush(&self) -> Result<()> {
        self.store.flush_all_pages()
    }

    // ========================================================================
    // Descent
    // ========================================================================

    /// Walk from the root to the leaf covering `key`. With
    /// `track_ancestors` the internal nodes passed on the way down are
    /// returned root-first; insert and remove need them, point lookups
    /// do not.
    fn find_leaf(&self, key: i32, track_ancestors: bool) -> Result<(LeafPage, Vec<InternalPage>)> {
        let mut ancestors = Vec::new();
        let mut current = self.root_page_id;
        loop {
            match self.read_node(current)? {
                BTreePage::Leaf(leaf) => return Ok((leaf, ancestors)),
                BTreePage::Internal(node) => {
                    current = node.child_at(node.search_child(key));
                    if track_ancestors {
                        ancestors.push(node);
                    }
                }
            }
        }
    }

    // ========================================================================
    // Insert propagation
    // ========================================================================

    /// Link a freshly split-off right node under the parent of `left_id`,
    /// splitting parents upward as needed.
    ///
    /// A full parent is split before the pending separator is placed, so
    /// the separator lands in whichever half covers it and is never lost.
    fn insert_into_parent(
        &mut self,
        left_id: PageId,
        key: i32,
        right_id: PageId,
        mut ancestors: Vec<InternalPage>,
    ) -> Result<()> {
        let mut pending = (left_id, key, right_id);
        loop {
            let Some(mut parent) = ancestors.pop() else {
                // The split node was the root: grow a level.
                let (new_root_id, page) = self.store.new_page()?;
                let root = InternalPage::new_root(
                    new_root_id,
                    self.max_size,
                    pending.1,
                    pending.0,
                    pending.2,
                );
                root.encode(&mut page.write());
                self.store.unpin_page(new_root_id, true)?;
                self.root_page_id = new_root_id;
                return Ok(());
            };

            if parent.insert_entry(pending.1, pending.2) {
                self.check_children_distinct(&parent)?;
                return self.write_internal(&parent);
            }

            // Parent already at capacity: split it first, then place the
            // pending separator in the half that covers it.
            let (sibling_id, sibling_page) = self.store.new_page()?;
            let (promoted, mut right_half) = parent.split(sibling_id);
            let target = if pending.1 < promoted {
                &mut parent
            } else {
                &mut right_half
            };
            if !target.insert_entry(pending.1, pending.2) {
                return Err(Error::Corrupted(format!(
                    "internal node {} still full after split",
                    target.page_id()
                )));
            }
            self.check_children_distinct(&parent)?;
            self.check_children_distinct(&right_half)?;

            self.write_internal(&parent)?;
            right_half.encode(&mut sibling_page.write());
            self.store.unpin_page(sibling_id, true)?;

            pending = (parent.page_id(), promoted, sibling_id);
        }
    }

    fn check_children_distinct(&self, node: &InternalPage) -> Result<()> {
        if node.children_distinct() {
            Ok(())
        } else {
            Err(Error::Corrupted(format!(
                "duplicate child pointer in internal node {}",
                node.page_id()
            )))
        }
    }

    // ========================================================================
    // Underflow handling
    // ========================================================================

    /// Restore a leaf that dropped below half occupancy: borrow from the
    /// right sibling, else the left, else merge (prefer right, else left)
    /// and fix up the parent.
    fn handle_leaf_underflow(
        &mut self,
        mut leaf: LeafPage,
        mut ancestors: Vec<InternalPage>,
    ) -> Result<()> {
        let Some(mut parent) = ancestors.pop() else {
            return Ok(()); // root tolerates underflow
        };
        let index = self.position_under_parent(&parent, leaf.page_id())?;

        // Borrow from the right sibling if it sits strictly above half
        // occupancy. The moved entry's successor becomes the separator.
        let right_sibling = if index < parent.size() {
            let mut right = self.read_leaf(parent.child_at(index + 1))?;
            if right.size() > right.min_size() {
                let (key, value) = right.take_first();
                leaf.insert(key, value);
                parent.set_key_at(index + 1, right.key_at(0));
                self.write_leaf(&leaf)?;
                self.write_leaf(&right)?;
                return self.write_internal(&parent);
            }
            Some(right)
        } else {
            None
        };

        // Same on the left; the borrowed entry itself becomes the
        // separator.
        let left_sibling = if index > 0 {
            let mut left = self.read_leaf(parent.child_at(index - 1))?;
            if left.size() > left.min_size() {
                let (key, value) = left.take_last();
                leaf.insert(key, value);
                parent.set_key_at(index, key);
                self.write_leaf(&left)?;
                self.write_leaf(&leaf)?;
                return self.write_internal(&parent);
            }
            Some(left)
        } else {
            None
        };

        // Neither side can lend: merge into the positionally left page
        // and drop the separator from the parent.
        if let Some(right) = right_sibling {
            let dead = right.page_id();
            leaf.absorb_right(right);
            parent.remove_entry(index + 1);
            self.write_leaf(&leaf)?;
            self.store.delete_page(dead)?;
        } else if let Some(mut left) = left_sibling {
            let dead = leaf.page_id();
            left.absorb_right(leaf);
            parent.remove_entry(index);
            self.write_leaf(&left)?;
            self.store.delete_page(dead)?;
        } else {
            return Err(Error::Corrupted(format!(
                "leaf {} has a parent but no siblings",
                parent.child_at(index)
            )));
        }

        self.finish_parent_after_merge(parent, ancestors)
    }

    /// Internal-node version of [`Self::handle_leaf_underflow`]. Borrowing
    /// rotates the shared separator through the parent; merging pulls it
    /// down between the two halves.
    fn handle_internal_underflow(
        &mut self,
        mut node: InternalPage,
        mut ancestors: Vec<InternalPage>,
    ) -> Result<()> {
        let Some(mut parent) = ancestors.pop() else {
            return Ok(());
        };
        let index = self.position_under_parent(&parent, node.page_id())?;

        let right_sibling = if index < parent.size() {
            let mut right = self.read_internal(parent.child_at(index + 1))?;
            if right.size() > right.min_size() {
                let (first_key, first_child) = right.pop_front();
                node.push_back(parent.key_at(index + 1), first_child);
                parent.set_key_at(index + 1, first_key);
                self.write_internal(&node)?;
                self.write_internal(&right)?;
                return self.write_internal(&parent);
            }
            Some(right)
        } else {
            None
        };

        let left_sibling = if index > 0 {
            let mut left = self.read_internal(parent.child_at(index - 1))?;
            if left.size() > left.min_size() {
                let (last_key, last_child) = left.pop_back();
                node.push_front(parent.key_at(index), last_child);
                parent.set_key_at(index, last_key);
                self.write_internal(&left)?;
                self.write_internal(&node)?;
                return self.write_internal(&parent);
            }
            Some(left)
        } else {
            None
        };

        if let Some(right) = right_sibling {
            let dead = right.page_id();
            node.absorb_right(parent.key_at(index + 1), right);
            parent.remove_entry(index + 1);
            self.write_internal(&node)?;
            self.store.delete_page(dead)?;
        } else if let Some(mut left) = left_sibling {
            let dead = node.page_id();
            left.absorb_right(parent.key_at(index), node);
            parent.remove_entry(index);
            self.write_internal(&left)?;
            self.store.delete_page(dead)?;
        } else {
            return Err(Error::Corrupted(format!(
                "internal node {} has a parent but no siblings",
                parent.child_at(index)
            )));
        }

        self.finish_parent_after_merge(parent, ancestors)
    }

    /// After a merge removed an entry from `parent`: collapse the root
    /// when it runs out of keys, otherwise persist it and recurse the
    /// underflow handling if it dropped below half occupancy.
    fn finish_parent_after_merge(
        &mut self,
        parent: InternalPage,
        ancestors: Vec<InternalPage>,
    ) -> Result<()> {
        if ancestors.is_empty() {
            if parent.size() == 0 {
                // Internal root with a single child left: the tree loses
                // a level.
                let dead = parent.page_id();
                self.root_page_id = parent.child_at(0);
                self.store.delete_page(dead)?;
                return Ok(());
            }
            return self.write_internal(&parent);
        }

        self.write_internal(&parent)?;
        if parent.size() < parent.min_size() {
            return self.handle_internal_underflow(parent, ancestors);
        }
        Ok(())
    }

    fn position_under_parent(&self, parent: &InternalPage, child: PageId) -> Result<usize> {
        parent.child_index(child).ok_or_else(|| {
            Error::Corrupted(format!(
                "{child} not found among children of {}",
                parent.page_id()
            ))
        })
    }

    // ========================================================================
    // Page store plumbing: fetch-decode-unpin / fetch-encode-unpin
    // ========================================================================

    fn read_node(&self, page_id: PageId) -> Result<BTreePage> {
        let page = self.store.fetch_page(page_id)?;
        let decoded = BTreePage::decode(&page.read());
        self.store.unpin_page(page_id, false)?;
        decoded
    }

    fn read_leaf(&self, page_id: PageId) -> Result<LeafPage> {
        match self.read_node(page_id)? {
            BTreePage::Leaf(leaf) => Ok(leaf),
            BTreePage::Internal(_) => Err(Error::Corrupted(format!(
                "expected a leaf at {page_id}, found an internal node"
            ))),
        }
    }

    fn read_internal(&self, page_id: PageId) -> Result<InternalPage> {
        match self.read_node(page_id)? {
            BTreePage::Internal(node) => Ok(node),
            BTreePage::Leaf(_) => Err(Error::Corrupted(format!(
                "expected an internal node at {page_id}, found a leaf"
            ))),
        }
    }

    fn write_leaf(&self, leaf: &LeafPage) -> Result<()> {
        let page = self.store.fetch_page(leaf.page_id())?;
        leaf.encode(&mut page.write());
        self.store.unpin_page(leaf.page_id(), true)
    }

    fn write_internal(&self, node: &InternalPage) -> Result<()> {
        let page = self.store.fetch_page(node.page_id())?;
        node.encode(&mut page.write());
        self.store.unpin_page(node.page_id(), true)
    }
}
