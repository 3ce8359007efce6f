use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use memtable::{Entry, Memtable};

const N_KEYS: usize = 10_000;
const VALUE_SIZE: usize = 100;

fn build_memtable() -> Memtable {
    let mut mem = Memtable::new();
    for i in 0..N_KEYS {
        mem.insert(Entry::value(
            format!("key{i}").into_bytes(),
            vec![b'x'; VALUE_SIZE],
            true,
            i as u64,
        ));
    }
    mem
}

fn insert_benchmark(c: &mut Criterion) {
    c.bench_function("memtable_insert_10k", |b| {
        b.iter_batched(Memtable::new, |mut mem| {
            for i in 0..N_KEYS {
                mem.insert(Entry::value(
                    format!("key{i}").into_bytes(),
                    vec![b'x'; VALUE_SIZE],
                    true,
                    i as u64,
                ));
            }
        }, BatchSize::SmallInput);
    });
}

fn find_hit_benchmark(c: &mut Criterion) {
    c.bench_function("memtable_find_hit_10k", |b| {
        b.iter_batched(
            build_memtable,
            |mem| {
                for i in 0..N_KEYS {
                    let key = format!("key{i}").into_bytes();
                    assert!(mem.find(&key).is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn iter_oldest_benchmark(c: &mut Criterion) {
    c.bench_function("memtable_iter_oldest_10k", |b| {
        b.iter_batched(
            build_memtable,
            |mem| mem.iter_oldest().count(),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, insert_benchmark, find_hit_benchmark, iter_oldest_benchmark);
criterion_main!(benches);
