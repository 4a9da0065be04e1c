//! End-to-end B+Tree tests over the real disk-backed buffer pool.

use std::collections::BTreeMap;

use burrowdb::buffer::{BufferPoolManager, MemStore};
use burrowdb::index::BPlusTree;
use burrowdb::storage::DiskManager;
use proptest::prelude::*;
use tempfile::tempdir;

fn disk_tree(
    pool_size: usize,
    max_size: usize,
) -> (BPlusTree<BufferPoolManager>, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tree.db");
    let dm = DiskManager::create(&path).unwrap();
    let pool = BufferPoolManager::new(pool_size, 2, dm);
    (BPlusTree::new(pool, max_size).unwrap(), dir)
}

#[test]
fn test_insert_scan_lookup() {
    let (mut tree, _dir) = disk_tree(16, 4);

    let keys = [100, 70, 10, 20, 30, 40, 50, 60, 33, 80, 11];
    for &k in &keys {
        assert!(tree.insert(k, k).unwrap());
    }

    assert_eq!(
        tree.all_keys().unwrap(),
        vec![10, 11, 20, 30, 33, 40, 50, 60, 70, 80, 100]
    );
    assert_eq!(tree.get_value(33).unwrap(), Some(33));
    assert_eq!(tree.get_value(999).unwrap(), None);
}

#[test]
fn test_remove_keeps_order() {
    let (mut tree, _dir) = disk_tree(16, 4);

    for k in (1..=10).map(|i| i * 10) {
        assert!(tree.insert(k, k).unwrap());
    }

    let mut expected: Vec<i32> = (1..=10).map(|i| i * 10).collect();
    for &k in &[100, 90, 80, 70] {
        assert!(tree.remove(k).unwrap());
        expected.pop();
        assert_eq!(tree.all_keys().unwrap(), expected, "after removing {k}");
    }

    // Removing an absent key fails with no change.
    assert!(!tree.remove(999).unwrap());
    assert_eq!(tree.all_keys().unwrap(), expected);
}

/// The working set is much larger than the pool, so the tree constantly
/// faults its own nodes back in through eviction.
#[test]
fn test_tree_larger_than_pool() {
    let (mut tree, _dir) = disk_tree(4, 4);

    let keys: Vec<i32> = (0..500).map(|i| (i * 37) % 1000).collect();
    let mut inserted = vec![];
    for &k in &keys {
        if tree.insert(k, k + 1).unwrap() {
            inserted.push(k);
        }
    }
    inserted.sort_unstable();

    assert_eq!(tree.all_keys().unwrap(), inserted);
    for &k in &inserted {
        assert_eq!(tree.get_value(k).unwrap(), Some(k + 1), "key {k}");
    }
    assert!(tree.store().stats().evictions > 0, "pool never evicted");
}

#[test]
fn test_persistence_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tree.db");
    let root;

    {
        let dm = DiskManager::create(&path).unwrap();
        let pool = BufferPoolManager::new(16, 2, dm);
        let mut tree = BPlusTree::new(pool, 4).unwrap();
        for k in 1..=100 {
            assert!(tree.insert(k, k * 2).unwrap());
        }
        tree.flush().unwrap();
        root = tree.root_page_id();
    }

    {
        let dm = DiskManager::open(&path).unwrap();
        let pool = BufferPoolManager::new(16, 2, dm);
        let mut tree = BPlusTree::open(pool, root).unwrap();

        assert_eq!(tree.all_keys().unwrap(), (1..=100).collect::<Vec<i32>>());
        assert_eq!(tree.get_value(42).unwrap(), Some(84));

        // The reopened tree keeps allocating from fresh page ids.
        assert!(tree.insert(101, 202).unwrap());
        assert!(tree.remove(1).unwrap());
        assert_eq!(tree.all_keys().unwrap(), (2..=101).collect::<Vec<i32>>());
    }
}

#[test]
fn test_mem_and_disk_stores_agree() {
    let (mut disk, _dir) = disk_tree(8, 4);
    let mut mem = BPlusTree::new(MemStore::new(), 4).unwrap();

    for k in [5, 1, 9, 3, 7, 2, 8, 4, 6, 0] {
        assert_eq!(disk.insert(k, k * 10).unwrap(), mem.insert(k, k * 10).unwrap());
    }
    for k in [3, 7, 0] {
        assert_eq!(disk.remove(k).unwrap(), mem.remove(k).unwrap());
    }

    assert_eq!(disk.all_keys().unwrap(), mem.all_keys().unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any interleaving of inserts and removes matches std's BTreeMap.
    #[test]
    fn prop_matches_btreemap(ops in prop::collection::vec((any::<bool>(), 0..200i32), 1..400)) {
        let mut tree = BPlusTree::new(MemStore::new(), 4).unwrap();
        let mut model = BTreeMap::new();

        for (is_insert, key) in ops {
            if is_insert {
                prop_assert_eq!(
                    tree.insert(key, key * 3).unwrap(),
                    model.insert(key, key * 3).is_none()
                );
            } else {
                prop_assert_eq!(tree.remove(key).unwrap(), model.remove(&key).is_some());
            }
        }

        let expected: Vec<i32> = model.keys().copied().collect();
        prop_assert_eq!(tree.all_keys().unwrap(), expected);
        for (&k, &v) in &model {
            prop_assert_eq!(tree.get_value(k).unwrap(), Some(v));
        }
    }

    /// Larger node capacities preserve the same observable behavior.
    #[test]
    fn prop_order_invariant_any_capacity(
        max_size in 4usize..32,
        keys in prop::collection::vec(-500..500i32, 1..200),
    ) {
        let mut tree = BPlusTree::new(MemStore::new(), max_size).unwrap();
        let mut model = BTreeMap::new();

        for k in keys {
            prop_assert_eq!(tree.insert(k, k).unwrap(), model.insert(k, k).is_none());
        }

        let all = tree.all_keys().unwrap();
        prop_assert!(all.windows(2).all(|w| w[0] < w[1]), "keys not strictly ascending");
        let expected: Vec<i32> = model.keys().copied().collect();
        prop_assert_eq!(all, expected);
    }
}
