//! Redis-backed cache, enabled by the `redis-tokio` / `redis-smol`
//! features.
//!
//! Redis serves as the shared memcache-style store: `SET NX EX` gives the
//! atomic create-if-absent, `INCRBY` the atomic counter. The one contract
//! mismatch — Redis creates missing counters at zero where memcached
//! fails — is papered over with a small server-side script so that the
//! eviction race stays observable.

mod redis_cache;
pub use redis_cache::*;
