use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use segment_store::SegmentStore;
use tempfile::tempdir;

const N_KEYS: usize = 10_000;
const VALUE_SIZE: usize = 100;

fn items() -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
    (0..N_KEYS)
        .map(|i| (format!("key{i}").into_bytes(), Some(vec![b'x'; VALUE_SIZE])))
        .collect()
}

fn store_benchmark(c: &mut Criterion) {
    c.bench_function("segment_store_store_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let store = SegmentStore::open(dir.path()).unwrap();
                (dir, store, items())
            },
            |(_dir, mut store, batch)| {
                store.store(&batch).unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn get_hit_benchmark(c: &mut Criterion) {
    c.bench_function("segment_store_get_hit_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let mut store = SegmentStore::open(dir.path()).unwrap();
                store.store(&items()).unwrap();
                (dir, store)
            },
            |(_dir, store)| {
                for i in 0..N_KEYS {
                    let key = format!("key{i}").into_bytes();
                    assert!(store.get(&key).unwrap().is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, store_benchmark, get_hit_benchmark);
criterion_main!(benches);
