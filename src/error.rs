use std::time::Duration;

/// Boxed error produced by a memoized computation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for the cache-store layer.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Redis error.
    #[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    /// The stored value is not an unsigned decimal integer, so it cannot
    /// be incremented.
    #[error("value for key {key:?} is not an unsigned integer")]
    NotNumeric {
        /// Key whose value failed to parse.
        key: String,
    },
    /// The cache backend could not be reached or refused the operation.
    #[error("cache backend unavailable: {reason}")]
    Unavailable {
        /// Backend-specific description of the failure.
        reason: String,
    },
}

/// Error type for this crate.
#[derive(Debug, thiserror::Error)]
pub enum HerdlockError {
    /// A cache operation failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    /// A lock could not be acquired within its timeout.
    #[error("timed out after {timeout:?} waiting for lock {key:?}")]
    LockTimeout {
        /// Key of the contended lock.
        key: String,
        /// How long the caller was willing to wait.
        timeout: Duration,
    },
    /// A cache failure occurred while recording or reading rate-limit
    /// usage. Never collapsed into "usage is zero".
    #[error("ratelimit cache failure: {source}")]
    Ratelimit {
        /// The underlying cache failure.
        source: CacheError,
    },
    /// A memoized computation failed. Nothing was cached.
    #[error("memoized computation failed: {source}")]
    Compute {
        /// The computation's own error.
        source: BoxError,
    },
    /// A memoized value or argument tuple could not be encoded/decoded.
    #[error("memoize encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    /// Invalid time slice width.
    #[error("invalid time slice width: {0}")]
    InvalidSliceSeconds(String),
}
