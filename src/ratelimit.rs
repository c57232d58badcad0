//! Time-sliced usage counters over the shared cache.
//!
//! Time is partitioned into fixed-width slices aligned to the epoch; each
//! `(prefix, slice)` pair owns one atomically incremented counter whose
//! TTL is pinned one second past the slice boundary, so counters retire
//! themselves. Counts are approximate under cache eviction: a counter
//! that vanishes between `add` and `incr` is reinitialized to 1, which
//! may undercount concurrent increments lost in the same window.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};

use crate::{CacheError, CacheStore, HerdlockError, SliceSeconds};

/// One fixed-width, epoch-aligned window of wall-clock time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSlice {
    /// Start of the window; its timestamp is floor-aligned to the slice
    /// width (sub-second resolution follows the clock sampled at
    /// construction).
    pub beginning: DateTime<Utc>,
    /// Whole seconds from construction time until `end`; always ≥ 1.
    pub remaining: u64,
    /// End of the window; `end - beginning` is exactly the slice width.
    pub end: DateTime<Utc>,
}

impl TimeSlice {
    /// The counter key for `key_prefix` within this slice.
    ///
    /// Formats the slice start as `-HHMMSS` so keys stay human-readable
    /// and distinct slices never collide.
    pub fn cache_key(&self, key_prefix: &str) -> String {
        format!("{key_prefix}-{}", self.beginning.format("%H%M%S"))
    }
}

/// Describe the current time slice for the given width.
///
/// `beginning` is the floor of now to a multiple of `slice_seconds` since
/// the epoch, `remaining` counts the seconds left until the window
/// closes, and `end` closes the window exactly one width after
/// `beginning`.
pub fn get_timeslice(slice_seconds: SliceSeconds) -> TimeSlice {
    let width = *slice_seconds as i64;
    let now = Utc::now();
    let secs_since = now.timestamp().rem_euclid(width);

    let beginning = now - TimeDelta::seconds(secs_since);
    let remaining = (*slice_seconds).saturating_sub(secs_since as u64);

    TimeSlice {
        beginning,
        remaining,
        end: beginning + TimeDelta::seconds(width),
    }
} // end fn get_timeslice

/// Usage counters for rate limiting, one per key prefix and time slice.
///
/// This type only counts; deciding what count is "over the limit" is the
/// caller's policy.
pub struct RateLimiter {
    cache: Arc<dyn CacheStore>,
}

impl RateLimiter {
    /// Create a rate limiter over the given cache.
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    /// Record one usage of `key_prefix` within `time_slice` and return
    /// the total so far, including this one.
    ///
    /// Any cache failure surfaces as [`HerdlockError::Ratelimit`] rather
    /// than a zero count, so an unavailable limiter is never mistaken
    /// for an idle one.
    pub async fn record_usage(
        &self,
        key_prefix: &str,
        time_slice: &TimeSlice,
    ) -> Result<u64, HerdlockError> {
        let key = time_slice.cache_key(key_prefix);
        let ttl = Duration::from_secs(time_slice.remaining + 1);

        // Idempotent init: "key exists" is the common, harmless outcome.
        self.cache
            .add(&key, b"0", ttl)
            .await
            .map_err(ratelimit_err)?;

        match self.cache.incr(&key, 1).await.map_err(ratelimit_err)? {
            Some(usage) => Ok(usage),
            None => {
                // The counter fell out of the cache between `add` and
                // `incr`. Reinitialize straight to 1: this increment is
                // the only one known to have happened, and any lost
                // concurrent increments are an accepted approximation.
                self.cache
                    .add(&key, b"1", ttl)
                    .await
                    .map_err(ratelimit_err)?;
                tracing::warn!("ratelimit.eviction, counter {key} evicted between add and incr");
                Ok(1)
            }
        }
    } // end method record_usage

    /// Current usage of `key_prefix` within `time_slice`; 0 when the
    /// counter is absent or already expired.
    pub async fn get_usage(
        &self,
        key_prefix: &str,
        time_slice: &TimeSlice,
    ) -> Result<u64, HerdlockError> {
        let key = time_slice.cache_key(key_prefix);

        match self.cache.get(&key).await.map_err(ratelimit_err)? {
            None => Ok(0),
            Some(bytes) => parse_count(&key, &bytes),
        }
    }
}

fn ratelimit_err(source: CacheError) -> HerdlockError {
    HerdlockError::Ratelimit { source }
}

fn parse_count(key: &str, bytes: &[u8]) -> Result<u64, HerdlockError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|text| text.trim().parse().ok())
        .ok_or_else(|| {
            ratelimit_err(CacheError::NotNumeric {
                key: key.to_string(),
            })
        })
}
