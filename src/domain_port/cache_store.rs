use std::time::Duration;

/// Volatile key-value store. Unavailability is transparent degradation, not
/// an error: `get` reports a miss and the writes report failure, and the
/// caller falls through to the source of truth. Implementations absorb and
/// log their transport errors.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    /// False when the value was not stored (unreachable store, zero ttl).
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool;

    /// False when the delete could not be issued.
    async fn delete(&self, key: &str) -> bool;
}
