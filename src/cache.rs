//! The key/value cache contract the coordination primitives are built on.
//!
//! The backing store is expected to behave like memcached: per-entry TTLs,
//! atomic create-if-absent (`add`) and increment (`incr`), and the freedom
//! to evict any entry early under memory pressure regardless of its TTL.
//! Everything in this crate that mutates shared state goes through `add`,
//! `incr` or `delete`; client-side read-modify-write would reintroduce the
//! races these primitives exist to avoid.

use std::time::Duration;

use async_trait::async_trait;

use crate::CacheError;

/// A shared, out-of-process key/value cache with atomic primitives.
///
/// Implementations must make [`add`](CacheStore::add) and
/// [`incr`](CacheStore::incr) atomic per key; no other cross-key or
/// cross-operation guarantees are assumed.
///
/// A `ttl` of [`Duration::ZERO`] means "no expiry" (memcached `time = 0`
/// semantics). Entries may still be evicted early by the backend.
///
/// Absence is always expressed in the type: a missing key is `Ok(None)`,
/// never an error, so "present but empty" and "absent" cannot be confused.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Like [`get`](CacheStore::get), but the backend may serve a value
    /// whose TTL has recently lapsed.
    ///
    /// Backends without stale-read support fall back to a plain `get`.
    async fn get_stale(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.get(key).await
    }

    /// Store `value` under `key`, replacing any existing entry.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Atomically create the entry if (and only if) `key` is absent.
    ///
    /// Returns `true` iff this call created the entry. This is the
    /// compare-and-swap primitive the lock is built on.
    async fn add(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, CacheError>;

    /// Atomically increment the ASCII-decimal counter under `key` by
    /// `delta`, returning the new value, or `None` if the key is absent.
    ///
    /// Absence is not an error: the rate limiter distinguishes "counter
    /// evicted" (`None`) from "cache down" (`Err`).
    async fn incr(&self, key: &str, delta: u64) -> Result<Option<u64>, CacheError>;

    /// Remove the entry under `key`. Returns `true` iff an entry existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
}
