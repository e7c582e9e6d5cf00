use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use keepsake::{local_state, MemoryStorage, StorageRuntime, Store};

fn store_set_benchmark(c: &mut Criterion) {
    let store = Store::new(0i64);

    c.bench_function("store_set", |b| {
        let mut i = 0i64;
        b.iter(|| {
            store.set(black_box(i));
            i += 1;
        });
    });
}

fn store_notify_benchmark(c: &mut Criterion) {
    let store = Store::new(0i64);
    let subs: Vec<_> = (0..8).map(|_| store.subscribe(|v| drop(black_box(v)))).collect();

    c.bench_function("store_set_with_8_subscribers", |b| {
        let mut i = 0i64;
        b.iter(|| {
            store.set(black_box(i));
            i += 1;
        });
    });

    drop(subs);
}

fn persisted_set_benchmark(c: &mut Criterion) {
    StorageRuntime::scope(MemoryStorage::new(), || {
        let counter = local_state("bench_counter", 0i64);

        c.bench_function("persisted_set", |b| {
            let mut i = 0i64;
            b.iter(|| {
                counter.set(black_box(i));
                i += 1;
            });
        });
    });
}

fn persisted_get_benchmark(c: &mut Criterion) {
    StorageRuntime::scope(MemoryStorage::new(), || {
        let counter = local_state("bench_get", 42i64);

        c.bench_function("persisted_get", |b| {
            b.iter(|| {
                black_box(counter.get());
            });
        });
    });
}

fn persisted_update_benchmark(c: &mut Criterion) {
    StorageRuntime::scope(MemoryStorage::new(), || {
        let counter = local_state("bench_update", 0i64);

        c.bench_function("persisted_update", |b| {
            b.iter(|| {
                counter.update(|n| black_box(n + 1));
            });
        });
    });
}

criterion_group!(
    benches,
    store_set_benchmark,
    store_notify_benchmark,
    persisted_set_benchmark,
    persisted_get_benchmark,
    persisted_update_benchmark
);
criterion_main!(benches);
