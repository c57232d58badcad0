//! Compute-once memoization over the shared cache.
//!
//! A [`Memoizer`] turns an expensive async computation into a cached one:
//! for a given argument value, at most one caller runs the computation
//! per TTL window while everyone else reads the cached result — or waits
//! on the [`CacheLock`] and picks up the winner's value. The
//! re-check-after-lock step is the thundering-herd mitigation: a caller
//! that lost the race to compute must observe the winner's result
//! instead of recomputing.
//!
//! Arguments are an explicit serializable value supplied by the caller;
//! the cache key is a SHA-256 of their canonical JSON, so distinct
//! argument sets cannot collide and equal values always map to the same
//! entry. "The computed result was empty" needs no reserved sentinel:
//! memoize an `Option<T>` and the empty result round-trips as JSON
//! `null`, while "never computed" stays a cache miss — the two are
//! distinguished by type, not by a magic value.

use std::{future::Future, sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use crate::{BoxError, CacheLock, CacheStore, HeldLocks, HerdlockError, LockOptions};

/// Configuration for [`Memoizer`].
#[derive(Clone, Debug)]
pub struct MemoizeOptions {
    /// TTL of cached results; [`Duration::ZERO`] means "no expiry".
    pub ttl: Duration,
    /// Serve values whose TTL recently lapsed instead of recomputing,
    /// on backends that support stale reads.
    pub stale: bool,
    /// Bounds both how long a caller waits for the compute lock and how
    /// long the lock entry lives while the computation runs.
    ///
    /// A computation that outruns this lets a second caller acquire the
    /// expired lock and compute concurrently; size it above your
    /// worst-case compute time.
    pub lock_timeout: Duration,
}

impl Default for MemoizeOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::ZERO,
            stale: false,
            lock_timeout: Duration::from_secs(30),
        }
    }
}

/// Compute-once cache for one family of computations.
///
/// The `prefix` names the computation family and namespaces its keys;
/// distinct computations must use distinct prefixes.
pub struct Memoizer {
    cache: Arc<dyn CacheStore>,
    lock: CacheLock,
    prefix: String,
    options: MemoizeOptions,
}

impl Memoizer {
    /// Create a memoizer for the computation family named `prefix`.
    pub fn new(
        cache: Arc<dyn CacheStore>,
        prefix: impl Into<String>,
        options: MemoizeOptions,
    ) -> Self {
        let lock = CacheLock::new(
            cache.clone(),
            LockOptions {
                hold_time: options.lock_timeout,
                timeout: options.lock_timeout,
                ..LockOptions::default()
            },
        );

        Self {
            cache,
            lock,
            prefix: prefix.into(),
            options,
        }
    } // end constructor

    /// The cache key for `args`: prefix plus a SHA-256 over the prefix
    /// and the canonical JSON encoding of `args`.
    ///
    /// Canonical JSON of a Rust value is deterministic by construction —
    /// struct fields and tuples keep their declared order, and ordered
    /// maps (`BTreeMap`) their key order. Callers memoizing over an
    /// unordered map should use an ordered one.
    pub fn cache_key<A>(&self, args: &A) -> Result<String, HerdlockError>
    where
        A: Serialize + ?Sized,
    {
        let canonical = serde_json::to_vec(args)?;

        let mut hasher = Sha256::new();
        hasher.update(self.prefix.as_bytes());
        hasher.update(b"|");
        hasher.update(&canonical);

        Ok(format!("{}:{}", self.prefix, hex::encode(hasher.finalize())))
    } // end method cache_key

    /// Return the cached result for `args`, or run `compute` to produce
    /// (and cache) it.
    ///
    /// Concurrent callers with equal `args` trigger at most one
    /// `compute` per TTL window; the rest wait on the lock and return
    /// the winner's value. A `compute` error propagates as
    /// [`HerdlockError::Compute`] and caches nothing; a lock wait that
    /// outlives [`MemoizeOptions::lock_timeout`] fails with
    /// [`HerdlockError::LockTimeout`] — a distinct failure mode callers
    /// should expect.
    pub async fn get_or_compute<A, T, F, Fut>(
        &self,
        held: &HeldLocks,
        args: &A,
        compute: F,
    ) -> Result<T, HerdlockError>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        self.run(held, args, compute, false).await
    }

    /// Recompute unconditionally and overwrite the cached result, even
    /// inside the TTL window.
    pub async fn refresh<A, T, F, Fut>(
        &self,
        held: &HeldLocks,
        args: &A,
        compute: F,
    ) -> Result<T, HerdlockError>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        self.run(held, args, compute, true).await
    }

    /// Drop the cached result for `args`, if any.
    pub async fn invalidate<A>(&self, args: &A) -> Result<(), HerdlockError>
    where
        A: Serialize + ?Sized,
    {
        let key = self.cache_key(args)?;
        self.cache.delete(&key).await?;
        Ok(())
    }

    async fn run<A, T, F, Fut>(
        &self,
        held: &HeldLocks,
        args: &A,
        compute: F,
        update: bool,
    ) -> Result<T, HerdlockError>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        let key = self.cache_key(args)?;

        if !update && let Some(bytes) = self.read(&key).await? {
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let lock_key = format!("memoize_lock({key})");
        let guard = self.lock.acquire(&lock_key, held).await?;
        let outcome = self.compute_and_store(&key, compute, update).await;
        let released = guard.release().await;

        match (outcome, released) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Ok(value), Ok(())) => Ok(value),
        }
    } // end method run

    async fn compute_and_store<T, F, Fut>(
        &self,
        key: &str,
        compute: F,
        update: bool,
    ) -> Result<T, HerdlockError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        // Re-check under the lock: a caller that lost the compute race
        // takes the winner's value instead of recomputing.
        if !update && let Some(bytes) = self.read(key).await? {
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let value = compute()
            .await
            .map_err(|source| HerdlockError::Compute { source })?;

        let bytes = serde_json::to_vec(&value)?;
        self.cache.set(key, &bytes, self.options.ttl).await?;
        Ok(value)
    } // end method compute_and_store

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, HerdlockError> {
        let found = if self.options.stale {
            self.cache.get_stale(key).await?
        } else {
            self.cache.get(key).await?
        };

        Ok(found)
    }
}
