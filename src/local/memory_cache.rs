use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};

use crate::{CacheError, CacheStore, runtime};

/// Configuration for [`MemoryCache`].
#[derive(Clone, Debug)]
pub struct MemoryCacheOptions {
    /// How long an expired entry remains readable through
    /// [`CacheStore::get_stale`] before it is treated as gone.
    pub stale_grace: Duration,
}

impl Default for MemoryCacheOptions {
    fn default() -> Self {
        Self {
            stale_grace: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: &[u8], ttl: Duration) -> Self {
        Self {
            value: value.to_vec(),
            expires_at: (!ttl.is_zero()).then(|| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Expired *and* past the stale-read grace period.
    fn is_gone(&self, stale_grace: Duration) -> bool {
        self.expires_at
            .is_some_and(|at| Instant::now() >= at + stale_grace)
    }
}

/// An in-process [`CacheStore`] backed by a [`DashMap`].
///
/// Per-key atomicity for [`add`](CacheStore::add) and
/// [`incr`](CacheStore::incr) comes from the map's entry locks. TTLs are
/// tracked with [`Instant`]s; an entry whose TTL has lapsed reads as
/// absent, but stays stale-readable for
/// [`MemoryCacheOptions::stale_grace`].
#[derive(Clone, Debug, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    options: MemoryCacheOptions,
}

impl MemoryCache {
    /// Create a cache with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache with the given options.
    pub fn with_options(options: MemoryCacheOptions) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            options,
        }
    } // end constructor

    /// Number of entries currently resident, including expired entries
    /// that have not been reclaimed yet.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start a background task that periodically drops entries whose TTL
    /// and stale-read grace have both lapsed, sweeping once a minute.
    pub fn run_cleanup_loop(&self) {
        self.run_cleanup_loop_with_config(60_000);
    }

    /// Start the cleanup task with a custom sweep interval.
    pub fn run_cleanup_loop_with_config(&self, sweep_interval_ms: u64) {
        let entries = self.entries.clone();
        let stale_grace = self.options.stale_grace;

        runtime::spawn_task(async move {
            let mut interval = runtime::new_interval(Duration::from_millis(sweep_interval_ms));

            loop {
                runtime::tick(&mut interval).await;
                entries.retain(|_, entry| !entry.is_gone(stale_grace));
            }
        });
    } // end method run_cleanup_loop_with_config
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn get_stale(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self
            .entries
            .get(key)
            .filter(|entry| !entry.is_gone(self.options.stale_grace))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn add(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, CacheError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().is_expired() => {
                occupied.insert(CacheEntry::new(value, ttl));
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value, ttl));
                Ok(true)
            }
        }
    } // end method add

    async fn incr(&self, key: &str, delta: u64) -> Result<Option<u64>, CacheError> {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return Ok(None);
        };

        if entry.is_expired() {
            return Ok(None);
        }

        let current: u64 = std::str::from_utf8(&entry.value)
            .ok()
            .and_then(|text| text.trim().parse().ok())
            .ok_or_else(|| CacheError::NotNumeric {
                key: key.to_string(),
            })?;

        let next = current.saturating_add(delta);
        entry.value = next.to_string().into_bytes();
        Ok(Some(next))
    } // end method incr

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }
}
