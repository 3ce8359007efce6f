use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use partition::Partition;
use tempfile::tempdir;

const N_KEYS: usize = 5_000;
const VALUE_SIZE: usize = 100;

fn insert_then_housekeeping_benchmark(c: &mut Criterion) {
    c.bench_function("partition_insert_then_housekeeping_5k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let partition = Partition::open(dir.path(), 0).unwrap();
                (dir, partition)
            },
            |(_dir, mut partition)| {
                for i in 0..N_KEYS {
                    partition.insert(format!("key{i}").as_bytes(), vec![b'x'; VALUE_SIZE]);
                }
                partition.housekeeping().unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn get_after_flush_benchmark(c: &mut Criterion) {
    c.bench_function("partition_get_after_flush_5k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let mut partition = Partition::open(dir.path(), 0).unwrap();
                for i in 0..N_KEYS {
                    partition.insert(format!("key{i}").as_bytes(), vec![b'x'; VALUE_SIZE]);
                }
                partition.housekeeping().unwrap();
                (dir, partition)
            },
            |(_dir, mut partition)| {
                for i in 0..N_KEYS {
                    let key = format!("key{i}");
                    assert!(partition.get(key.as_bytes()).unwrap().is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, insert_then_housekeeping_benchmark, get_after_flush_benchmark);
criterion_main!(benches);
