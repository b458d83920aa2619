// ==============================================
// CONCURRENT ACCESS (integration)
// ==============================================
//
// The cache promises linearizability with respect to its single lock:
// arbitrarily many threads may interleave reads, writes, and deletes on a
// shared instance without the bounds or the internal indexes drifting.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use keystash::{Cache, EvictionPolicy};

#[test]
fn writes_from_many_threads_all_land() {
    let cache: Arc<Cache<u64>> = Arc::new(Cache::<u64>::builder().max_size(0).build());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..250u64 {
                    cache.set(format!("key-{t}-{i}"), t * 1000 + i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.count(), 2000);
    for t in 0..8u64 {
        assert_eq!(cache.get(&format!("key-{t}-0")), Some(t * 1000));
    }
}

#[test]
fn bounded_cache_stays_bounded_under_contention() {
    for policy in [
        EvictionPolicy::Fifo,
        EvictionPolicy::Lru,
        EvictionPolicy::Lfu,
    ] {
        let cache: Arc<Cache<u64>> = Arc::new(
            Cache::<u64>::builder()
                .max_size(64)
                .eviction_policy(policy)
                .build(),
        );

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..1_000u64 {
                        match i % 4 {
                            0 | 1 => cache.set(format!("key{}", (t * 31 + i) % 200), i),
                            2 => {
                                let _ = cache.get(&format!("key{}", i % 200));
                            },
                            _ => {
                                let _ = cache.delete(&format!("key{}", i % 50));
                            },
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(
            cache.count() <= 64,
            "policy {policy:?} exceeded its bound under contention"
        );
    }
}

#[test]
fn readers_observe_completed_writes() {
    let cache: Arc<Cache<String>> = Arc::new(Cache::new());
    cache.set("shared", "before".to_string());

    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            cache.set("shared", "after".to_string());
        })
    };
    writer.join().unwrap();

    // A read that starts after the writing thread was joined must see its
    // value.
    assert_eq!(cache.get("shared").as_deref(), Some("after"));
}

#[test]
fn mixed_workload_with_janitor_and_ttls() {
    let cache: Arc<Cache<u64>> = Arc::new(
        Cache::<u64>::builder()
            .max_size(256)
            .eviction_policy(EvictionPolicy::Lru)
            .build(),
    );
    cache.start_janitor().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..500u64 {
                    let key = format!("k{}", (t * 17 + i) % 300);
                    match i % 5 {
                        0 => cache.set(key.as_str(), i),
                        1 => cache.set_with_ttl(key.as_str(), i, Some(Duration::from_millis(2))),
                        2 | 3 => {
                            let _ = cache.get(&key);
                        },
                        _ => {
                            let _ = cache.ttl(&key);
                        },
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    cache.stop_janitor();
    assert!(cache.count() <= 256);

    // Counters are consistent with the rules: every hit or miss came from a
    // get, and nothing went negative anywhere.
    let stats = cache.stats();
    assert!(stats.hits + stats.misses + stats.expired_keys >= 800);
}

#[test]
fn stats_snapshots_are_consistent_while_writing() {
    let cache: Arc<Cache<u64>> = Arc::new(Cache::<u64>::builder().max_size(32).build());

    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for i in 0..2_000u64 {
                cache.set(format!("key{}", i % 100), i);
            }
        })
    };

    let mut last = cache.stats();
    while !writer.is_finished() {
        let now = cache.stats();
        assert!(now.evicted_keys >= last.evicted_keys);
        assert!(now.hits >= last.hits);
        last = now;
    }
    writer.join().unwrap();
}
