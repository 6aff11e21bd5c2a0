use crate::domain_port::CacheStore;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Redis-backed volatile store. Transport failures are absorbed here: a
/// request must never fail because the cache is down, so `get` degrades to
/// a miss and the writes report `false`, each with a warning.
pub struct RedisCacheStore {
    conn: ConnectionManager,
}

impl RedisCacheStore {
    pub fn new(conn: ConnectionManager) -> Self {
        RedisCacheStore { conn }
    }
}

#[async_trait::async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("cache get {key} degraded to miss: {e}");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool {
        let secs = ttl.as_secs();
        if secs == 0 {
            // a zero tier disables this key class
            return false;
        }

        let mut conn = self.conn.clone();
        match conn.set_ex::<_, _, ()>(key, value, secs).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("cache set {key} failed: {e}");
                false
            }
        }
    }

    async fn delete(&self, key: &str) -> bool {
        let mut conn = self.conn.clone();
        match conn.del::<_, ()>(key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("cache delete {key} failed: {e}");
                false
            }
        }
    }
}
