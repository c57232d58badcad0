//! Top-level entrypoint wiring the primitives over one shared cache.
//!
//! [`Herdlock`] owns the cache handle and hands out the lock, the rate
//! limiter and per-computation memoizers, so application code configures
//! the cache connection once.

use std::sync::Arc;

use crate::{CacheLock, CacheStore, LockOptions, MemoizeOptions, Memoizer, RateLimiter};

/// Top-level configuration for [`Herdlock`].
#[derive(Clone)]
pub struct HerdlockOptions {
    /// The shared cache every primitive coordinates through.
    pub cache: Arc<dyn CacheStore>,
    /// Options for locks handed out by [`Herdlock::lock`].
    pub lock: LockOptions,
}

/// Coordination primitives over one shared cache.
pub struct Herdlock {
    cache: Arc<dyn CacheStore>,
    lock: CacheLock,
    ratelimiter: RateLimiter,
}

impl Herdlock {
    /// Create a new [`Herdlock`].
    pub fn new(options: HerdlockOptions) -> Self {
        Self {
            lock: CacheLock::new(options.cache.clone(), options.lock),
            ratelimiter: RateLimiter::new(options.cache.clone()),
            cache: options.cache,
        }
    }

    /// The underlying cache handle.
    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// The distributed lock.
    pub fn lock(&self) -> &CacheLock {
        &self.lock
    }

    /// The rate-limit usage counters.
    pub fn ratelimiter(&self) -> &RateLimiter {
        &self.ratelimiter
    }

    /// A memoizer for the computation family named `prefix`, sharing
    /// this instance's cache.
    pub fn memoizer(&self, prefix: impl Into<String>, options: MemoizeOptions) -> Memoizer {
        Memoizer::new(self.cache.clone(), prefix, options)
    }
}
