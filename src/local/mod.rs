//! In-process cache backend.
//!
//! [`MemoryCache`] keeps entries in the current process using a
//! [`DashMap`](dashmap::DashMap). It exists for single-process
//! deployments and for tests; it is not shared across processes, so
//! locks and counters held in it only coordinate tasks within one
//! process.
//!
//! Expired entries are evicted lazily on access. Long-lived caches with
//! unbounded key cardinality should also run
//! [`MemoryCache::run_cleanup_loop`] to reclaim memory for keys that are
//! never touched again.

mod memory_cache;
pub use memory_cache::*;
