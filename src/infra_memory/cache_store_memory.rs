use crate::domain_port::CacheStore;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// In-process volatile store with real expiry, for the `memory` backend and
/// for tests.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                let (value, expires_at) = entry.value();
                if *expires_at > Instant::now() {
                    return Some(value.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool {
        if ttl.is_zero() {
            // a zero tier disables this key class
            return false;
        }
        self.entries
            .insert(key.to_owned(), (value.to_owned(), Instant::now() + ttl));
        true
    }

    async fn delete(&self, key: &str) -> bool {
        self.entries.remove(key);
        true
    }
}
