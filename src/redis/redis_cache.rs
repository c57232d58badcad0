use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::{CacheError, CacheStore};

/// A [`CacheStore`] over Redis.
///
/// Holds a [`ConnectionManager`], which multiplexes one reconnecting
/// connection across clones; every operation clones the manager, so the
/// cache itself is cheaply `Clone` and shareable.
///
/// Redis has no server-side stale reads, so
/// [`get_stale`](CacheStore::get_stale) falls back to a plain `GET`.
#[derive(Clone)]
pub struct RedisCache {
    connection_manager: ConnectionManager,
}

impl RedisCache {
    /// Wrap an existing connection manager.
    pub fn new(connection_manager: ConnectionManager) -> Self {
        Self { connection_manager }
    }

    /// Connect to the given Redis URL.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let connection_manager = client.get_connection_manager().await?;
        Ok(Self { connection_manager })
    } // end constructor connect
}

/// Whole seconds for `EX`, rounding sub-second TTLs up so they never
/// collapse to "no expiry".
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 { secs + 1 } else { secs }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut connection_manager = self.connection_manager.clone();

        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection_manager)
            .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut connection_manager = self.connection_manager.clone();

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if !ttl.is_zero() {
            cmd.arg("EX").arg(ttl_seconds(ttl));
        }

        let _: () = cmd.query_async(&mut connection_manager).await?;
        Ok(())
    }

    async fn add(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, CacheError> {
        let mut connection_manager = self.connection_manager.clone();

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if !ttl.is_zero() {
            cmd.arg("EX").arg(ttl_seconds(ttl));
        }

        // SET .. NX replies OK when the key was created, nil otherwise.
        let reply: Option<String> = cmd.query_async(&mut connection_manager).await?;
        Ok(reply.is_some())
    } // end method add

    async fn incr(&self, key: &str, delta: u64) -> Result<Option<u64>, CacheError> {
        // Plain INCRBY creates missing keys at zero, which would hide the
        // eviction race the rate limiter has to detect; keep the memcached
        // fail-if-absent contract with a script.
        let script = redis::Script::new(
            r#"
            if redis.call("EXISTS", KEYS[1]) == 1 then
                return redis.call("INCRBY", KEYS[1], ARGV[1])
            end
            return false
        "#,
        );

        let mut connection_manager = self.connection_manager.clone();

        let next: Option<u64> = script
            .key(key)
            .arg(delta)
            .invoke_async(&mut connection_manager)
            .await?;

        Ok(next)
    } // end method incr

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut connection_manager = self.connection_manager.clone();

        let removed: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut connection_manager)
            .await?;

        Ok(removed > 0)
    }
}
