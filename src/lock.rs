//! Global mutual exclusion over the shared cache.
//!
//! A lock is nothing but a cache entry created with the atomic
//! [`add`](crate::CacheStore::add) primitive: whoever creates the entry
//! holds the lock, everyone else spin-waits with a fixed retry interval
//! until the entry disappears or their timeout lapses. There is no
//! notification mechanism in the backing store, so spin-wait is the
//! design, not an optimization gap; the primitive suits "compute once,
//! rarely" workloads, not high-frequency locking.
//!
//! The entry carries a TTL ([`LockOptions::hold_time`]) as a safety net:
//! a holder that crashes without releasing blocks waiters only until the
//! entry expires.

use std::{
    collections::HashSet,
    future::Future,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::{CacheStore, HerdlockError, runtime};

/// Per-task record of which lock keys the task currently holds.
///
/// Create one `HeldLocks` per logical task (request handler, job run) and
/// pass it to every acquisition made on that task's behalf. Re-acquiring
/// a key already present in the context is a no-op instead of a
/// self-deadlock, and releasing that no-op leaves the outer acquisition
/// intact.
///
/// The context is purely local bookkeeping, not a synchronization
/// primitive; sharing one instance across unrelated concurrent tasks
/// would let one task silently piggyback on another's lock.
#[derive(Clone, Debug, Default)]
pub struct HeldLocks {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl HeldLocks {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this context currently holds `key`.
    pub fn is_held(&self, key: &str) -> bool {
        self.inner.lock().expect("poisoned lock set").contains(key)
    }

    fn insert(&self, key: &str) {
        self.inner
            .lock()
            .expect("poisoned lock set")
            .insert(key.to_string());
    }

    fn remove(&self, key: &str) {
        self.inner.lock().expect("poisoned lock set").remove(key);
    }
}

/// Configuration for [`CacheLock`].
#[derive(Clone, Debug)]
pub struct LockOptions {
    /// TTL of the lock's cache entry; bounds how long a crashed holder
    /// can block waiters.
    pub hold_time: Duration,
    /// How long [`CacheLock::acquire`] keeps retrying before failing
    /// with [`HerdlockError::LockTimeout`].
    pub timeout: Duration,
    /// Fixed sleep between retries of the `add` race.
    pub retry_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            hold_time: Duration::from_secs(30),
            timeout: Duration::from_secs(30),
            retry_interval: Duration::from_millis(100),
        }
    }
}

/// A distributed lock factory over one shared cache.
pub struct CacheLock {
    cache: Arc<dyn CacheStore>,
    options: LockOptions,
}

impl CacheLock {
    /// Create a lock factory with the given options.
    pub fn new(cache: Arc<dyn CacheStore>, options: LockOptions) -> Self {
        Self { cache, options }
    }

    /// The options acquisitions run with.
    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    /// Block until this task owns `key`, or fail with
    /// [`HerdlockError::LockTimeout`] once
    /// [`LockOptions::timeout`] has elapsed.
    ///
    /// If `held` already contains `key` the call returns immediately with
    /// a non-owning guard whose release is a no-op.
    ///
    /// `hold_time` and `timeout` are independent: a waiter prepared to
    /// wait longer than the holder's `hold_time` can still win once the
    /// holder's entry expires.
    pub async fn acquire(
        &self,
        key: &str,
        held: &HeldLocks,
    ) -> Result<LockGuard, HerdlockError> {
        if held.is_held(key) {
            return Ok(LockGuard {
                cache: self.cache.clone(),
                key: key.to_string(),
                held: held.clone(),
                owned: false,
                released: false,
            });
        }

        let start = Instant::now();

        loop {
            if self.cache.add(key, b"1", self.options.hold_time).await? {
                held.insert(key);
                return Ok(LockGuard {
                    cache: self.cache.clone(),
                    key: key.to_string(),
                    held: held.clone(),
                    owned: true,
                    released: false,
                });
            }

            if start.elapsed() > self.options.timeout {
                return Err(HerdlockError::LockTimeout {
                    key: key.to_string(),
                    timeout: self.options.timeout,
                });
            }

            runtime::sleep(self.options.retry_interval).await;
        }
    } // end method acquire

    /// Run `f` while holding `key`, releasing on every exit path.
    ///
    /// The closure's error is preferred over a release error when both
    /// occur.
    pub async fn with_lock<T, F, Fut>(
        &self,
        key: &str,
        held: &HeldLocks,
        f: F,
    ) -> Result<T, HerdlockError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, HerdlockError>>,
    {
        let guard = self.acquire(key, held).await?;
        let outcome = f().await;
        let released = guard.release().await;

        match (outcome, released) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Ok(value), Ok(())) => Ok(value),
        }
    } // end method with_lock
}

/// Proof of a completed [`CacheLock::acquire`].
///
/// Call [`release`](LockGuard::release) when done; only the acquisition
/// that actually won the `add` race deletes the cache entry, so releasing
/// a reentrant guard never steals an outer acquisition's lock.
///
/// A guard dropped without an explicit release schedules a background
/// release as a safety net. That path needs a running runtime and gives
/// no completion signal; treat it as a bug catcher, not an API.
#[must_use = "the lock is held until the guard is released"]
pub struct LockGuard {
    cache: Arc<dyn CacheStore>,
    key: String,
    held: HeldLocks,
    owned: bool,
    released: bool,
}

impl LockGuard {
    /// Whether this guard's acquisition won the lock (as opposed to a
    /// reentrant no-op).
    pub fn is_owner(&self) -> bool {
        self.owned
    }

    /// Release the lock: delete the cache entry and clear the held-set
    /// marker. No-op for reentrant guards.
    pub async fn release(mut self) -> Result<(), HerdlockError> {
        self.released = true;

        if !self.owned {
            return Ok(());
        }

        self.held.remove(&self.key);
        self.cache.delete(&self.key).await?;
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.owned && !self.released {
            let cache = self.cache.clone();
            let key = std::mem::take(&mut self.key);

            self.held.remove(&key);
            tracing::warn!("lock.leak, guard for {key:?} dropped without release");
            runtime::spawn_task(async move {
                let _ = cache.delete(&key).await;
            });
        }
    }
}
