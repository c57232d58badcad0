use std::{sync::Arc, time::Duration};

use criterion::{Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use std::hint::black_box;

use herdlock::{
    CacheLock, CacheStore, HeldLocks, LockOptions, MemoizeOptions, Memoizer, MemoryCache,
};

fn bench_cache_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_cache/ops");
    group.sample_size(200);

    group.bench_function("get/hit", |b| {
        let cache = MemoryCache::new();
        block_on(cache.set("k", b"value", Duration::ZERO)).unwrap();

        b.iter(|| {
            black_box(block_on(cache.get(black_box("k"))).unwrap());
        });
    });

    group.bench_function("get/miss", |b| {
        let cache = MemoryCache::new();

        b.iter(|| {
            black_box(block_on(cache.get(black_box("missing"))).unwrap());
        });
    });

    group.bench_function("incr", |b| {
        let cache = MemoryCache::new();
        block_on(cache.add("k", b"0", Duration::ZERO)).unwrap();

        b.iter(|| {
            black_box(block_on(cache.incr(black_box("k"), 1)).unwrap());
        });
    });

    group.finish();
}

fn bench_lock_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock/uncontended");
    group.sample_size(200);

    group.bench_function("acquire_release", |b| {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let lock = CacheLock::new(cache, LockOptions::default());
        let held = HeldLocks::new();

        b.iter(|| {
            block_on(async {
                let guard = lock.acquire(black_box("k"), &held).await.unwrap();
                guard.release().await.unwrap();
            });
        });
    });

    group.finish();
}

fn bench_memoize_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("memoize/hit");
    group.sample_size(200);

    group.bench_function("get_or_compute/cached", |b| {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let memo = Memoizer::new(cache, "bench", MemoizeOptions::default());
        let held = HeldLocks::new();

        // Warm the entry so iterations measure the hit path.
        let warmed: u64 =
            block_on(memo.get_or_compute(&held, &(1_u64,), || async { Ok(42) })).unwrap();
        assert_eq!(warmed, 42);

        b.iter(|| {
            let value: u64 = block_on(memo.get_or_compute(
                black_box(&held),
                black_box(&(1_u64,)),
                || async { Ok(42) },
            ))
            .unwrap();
            black_box(value);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_cache_ops, bench_lock_cycle, bench_memoize_hit);
criterion_main!(benches);
