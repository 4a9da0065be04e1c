//! B+Tree benchmarks: insert/lookup/scan over the in-memory store and
//! the disk-backed buffer pool.

use burrowdb::buffer::{BufferPoolManager, MemStore};
use burrowdb::index::BPlusTree;
use burrowdb::storage::DiskManager;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::tempdir;

const NODE_CAPACITY: usize = 64;
const KEYS: i32 = 10_000;

fn shuffled_keys() -> Vec<i32> {
    // Deterministic permutation of 0..KEYS (multiplicative walk).
    (0..KEYS).map(|i| (i * 7919) % KEYS).collect()
}

fn mem_tree_with_keys() -> BPlusTree<MemStore> {
    let mut tree = BPlusTree::new(MemStore::new(), NODE_CAPACITY).unwrap();
    for k in shuffled_keys() {
        tree.insert(k, k).unwrap();
    }
    tree
}

fn bench_insert_mem(c: &mut Criterion) {
    let keys = shuffled_keys();
    c.bench_function("btree_insert_mem_10k", |b| {
        b.iter_batched(
            || BPlusTree::new(MemStore::new(), NODE_CAPACITY).unwrap(),
            |mut tree| {
                for &k in &keys {
                    tree.insert(black_box(k), k).unwrap();
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_insert_disk(c: &mut Criterion) {
    let keys = shuffled_keys();
    c.bench_function("btree_insert_disk_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let dm = DiskManager::create(dir.path().join("bench.db")).unwrap();
                let pool = BufferPoolManager::new(256, 2, dm);
                (BPlusTree::new(pool, NODE_CAPACITY).unwrap(), dir)
            },
            |(mut tree, _dir)| {
                for &k in &keys {
                    tree.insert(black_box(k), k).unwrap();
                }
            },
            BatchSize::PerIteration,
        );
    });
}

fn bench_lookup(c: &mut Criterion) {
    let tree = mem_tree_with_keys();
    let mut i = 0;
    c.bench_function("btree_get_value", |b| {
        b.iter(|| {
            i = (i + 1) % KEYS;
            black_box(tree.get_value(black_box(i)).unwrap());
        });
    });
}

fn bench_full_scan(c: &mut Criterion) {
    let tree = mem_tree_with_keys();
    c.bench_function("btree_all_keys_10k", |b| {
        b.iter(|| black_box(tree.all_keys().unwrap()));
    });
}

criterion_group!(
    benches,
    bench_insert_mem,
    bench_insert_disk,
    bench_lookup,
    bench_full_scan
);
criterion_main!(benches);
