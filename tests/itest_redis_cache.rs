#![cfg(any(feature = "redis-tokio", feature = "redis-smol"))]

use std::{env, future::Future, sync::Arc, time::Duration};

use herdlock::{
    CacheLock, CacheStore, HeldLocks, LockOptions, MemoizeOptions, Memoizer, RateLimiter,
    RedisCache, SliceSeconds, get_timeslice,
};

fn redis_url() -> Option<String> {
    env::var("REDIS_URL").ok()
}

fn unique_prefix() -> String {
    let n: u64 = rand::random();
    format!("herdlock_test_{n}")
}

#[cfg(feature = "rt-tokio")]
fn block_on<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::runtime::Runtime::new().unwrap().block_on(f)
}

#[cfg(all(feature = "rt-smol", not(feature = "rt-tokio")))]
fn block_on<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    smol::block_on(f)
}

async fn connect(url: &str) -> Arc<dyn CacheStore> {
    Arc::new(RedisCache::connect(url).await.unwrap())
}

#[test]
fn add_is_create_if_absent() {
    let Some(url) = redis_url() else {
        eprintln!("skipping: REDIS_URL not set");
        return;
    };

    block_on(async {
        let cache = connect(&url).await;
        let key = unique_prefix();

        assert!(cache.add(&key, b"first", Duration::from_secs(30)).await.unwrap());
        assert!(!cache.add(&key, b"second", Duration::from_secs(30)).await.unwrap());
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"first".to_vec()));

        assert!(cache.delete(&key).await.unwrap());
        assert_eq!(cache.get(&key).await.unwrap(), None);
    });
}

#[test]
fn incr_fails_on_absent_keys_and_counts_on_present_ones() {
    let Some(url) = redis_url() else {
        eprintln!("skipping: REDIS_URL not set");
        return;
    };

    block_on(async {
        let cache = connect(&url).await;
        let key = unique_prefix();

        assert_eq!(cache.incr(&key, 1).await.unwrap(), None);

        cache.add(&key, b"0", Duration::from_secs(30)).await.unwrap();
        assert_eq!(cache.incr(&key, 1).await.unwrap(), Some(1));
        assert_eq!(cache.incr(&key, 4).await.unwrap(), Some(5));

        cache.delete(&key).await.unwrap();
    });
}

#[test]
fn entries_honor_their_ttl() {
    let Some(url) = redis_url() else {
        eprintln!("skipping: REDIS_URL not set");
        return;
    };

    block_on(async {
        let cache = connect(&url).await;
        let key = unique_prefix();

        cache.set(&key, b"v", Duration::from_secs(1)).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_some());

        #[cfg(feature = "rt-tokio")]
        tokio::time::sleep(Duration::from_millis(1500)).await;
        #[cfg(all(feature = "rt-smol", not(feature = "rt-tokio")))]
        smol::Timer::after(Duration::from_millis(1500)).await;

        assert_eq!(cache.get(&key).await.unwrap(), None);
    });
}

#[test]
fn lock_excludes_a_second_context() {
    let Some(url) = redis_url() else {
        eprintln!("skipping: REDIS_URL not set");
        return;
    };

    block_on(async {
        let cache = connect(&url).await;
        let key = unique_prefix();
        let lock = CacheLock::new(
            cache.clone(),
            LockOptions {
                hold_time: Duration::from_secs(30),
                timeout: Duration::from_millis(300),
                retry_interval: Duration::from_millis(50),
            },
        );

        let holder = HeldLocks::new();
        let guard = lock.acquire(&key, &holder).await.unwrap();
        assert!(guard.is_owner());

        let waiter = HeldLocks::new();
        assert!(lock.acquire(&key, &waiter).await.is_err());

        guard.release().await.unwrap();
        let guard = lock.acquire(&key, &waiter).await.unwrap();
        guard.release().await.unwrap();
    });
}

#[test]
fn memoized_value_survives_between_clients() {
    let Some(url) = redis_url() else {
        eprintln!("skipping: REDIS_URL not set");
        return;
    };

    block_on(async {
        let prefix = unique_prefix();
        let held = HeldLocks::new();

        let first = Memoizer::new(
            connect(&url).await,
            prefix.clone(),
            MemoizeOptions::default(),
        );
        let value: u64 = first
            .get_or_compute(&held, &(1,), || async { Ok(11) })
            .await
            .unwrap();
        assert_eq!(value, 11);

        // A separate connection sees the cached value and never computes.
        let second = Memoizer::new(
            connect(&url).await,
            prefix.clone(),
            MemoizeOptions::default(),
        );
        let value: u64 = second
            .get_or_compute(&held, &(1,), || async {
                Err("value should have been served from the cache".into())
            })
            .await
            .unwrap();
        assert_eq!(value, 11);

        first.invalidate(&(1,)).await.unwrap();
    });
}

#[test]
fn usage_counts_accumulate_in_redis() {
    let Some(url) = redis_url() else {
        eprintln!("skipping: REDIS_URL not set");
        return;
    };

    block_on(async {
        let cache = connect(&url).await;
        let limiter = RateLimiter::new(cache.clone());
        let prefix = unique_prefix();
        let slice = get_timeslice(SliceSeconds::try_from(60).unwrap());

        for expected in 1..=3 {
            assert_eq!(
                limiter.record_usage(&prefix, &slice).await.unwrap(),
                expected
            );
        }
        assert_eq!(limiter.get_usage(&prefix, &slice).await.unwrap(), 3);

        cache.delete(&slice.cache_key(&prefix)).await.unwrap();
    });
}
