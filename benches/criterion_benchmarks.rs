use std::time::Duration;

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ringcache::cache::BoundedCache;
use ringcache::hashring::ConsistentHash;

const CACHE_SIZE: usize = 1000;

fn make_cache(entries: usize) -> BoundedCache {
    // Each entry here costs ~8 bytes; budget generously so the benchmarked
    // workload never triggers eviction mid-measurement.
    let cache = BoundedCache::with_policy_name("lru", entries * 64, Duration::from_secs(3600)).unwrap();
    for i in 0..entries {
        cache.add(&i.to_string(), Bytes::from(i.to_string()));
    }
    cache
}

pub fn cache_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("BoundedCache");

    {
        let cache = make_cache(CACHE_SIZE);
        group.bench_function("get hit (lru)", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(cache.get(&(i % CACHE_SIZE).to_string()));
                }
            });
        });

        group.bench_function("get miss (lru)", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(cache.get(&(i + CACHE_SIZE).to_string()));
                }
            });
        });
    }

    {
        let cache = BoundedCache::with_policy_name("lru", CACHE_SIZE * 64, Duration::from_secs(3600)).unwrap();
        group.bench_function("add (triggers steady-state eviction)", |b| {
            let mut i = 0usize;
            b.iter(|| {
                cache.add(&i.to_string(), Bytes::from(i.to_string()));
                i += 1;
            });
        });
    }

    {
        let cache = make_cache(CACHE_SIZE);
        group.bench_function("get hit (fifo)", |b| {
            let fifo = BoundedCache::with_policy_name("fifo", CACHE_SIZE * 64, Duration::from_secs(3600)).unwrap();
            for i in 0..CACHE_SIZE {
                fifo.add(&i.to_string(), Bytes::from(i.to_string()));
            }
            b.iter(|| {
                for i in 0..100 {
                    black_box(fifo.get(&(i % CACHE_SIZE).to_string()));
                }
            });
        });
        drop(cache);
    }

    group.finish();
}

pub fn hashring_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("ConsistentHash");
    let ring = ConsistentHash::new(100);
    let members: Vec<String> = (0..16).map(|i| format!("node-{i}")).collect();

    group.bench_function("pick (warm ring)", |b| {
        ring.pick(&members, "warm-up");
        b.iter(|| {
            for i in 0..100 {
                black_box(ring.pick(&members, &format!("key-{i}")));
            }
        });
    });

    group.bench_function("pick (membership changes every call)", |b| {
        let mut variant = members.clone();
        b.iter(|| {
            variant.push("extra".to_string());
            black_box(ring.pick(&variant, "key"));
            variant.pop();
        });
    });

    group.finish();
}

criterion_group!(benches, cache_benchmark, hashring_benchmark);
criterion_main!(benches);
