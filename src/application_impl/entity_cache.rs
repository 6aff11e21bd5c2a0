use crate::domain_port::CacheStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Ranking key deleted on coarse invalidation; rankings cached under other
/// limits stay until their ttl expires.
pub const DEFAULT_RANKING_LIMIT: u16 = 10;

/// Per-key-class ttls. Single-entity snapshots are invalidated on mutation,
/// so they tolerate a long ttl; list and ranking keys are mostly
/// ttl-bounded and stay short.
#[derive(Debug, Clone, Copy)]
pub struct TtlTiers {
    pub entity: Duration,
    pub list: Duration,
    pub ranking: Duration,
}

impl Default for TtlTiers {
    fn default() -> Self {
        TtlTiers {
            entity: Duration::from_secs(3600),
            list: Duration::from_secs(60),
            ranking: Duration::from_secs(300),
        }
    }
}

/// Cache-aside accessors over a volatile store, namespaced per entity.
///
/// Keys follow `cache:<namespace>:...`. Invalidation is coarse by design:
/// `invalidate_entity` removes the entity snapshot, the unfiltered list and
/// the default ranking key; filtered-list keys (derived from arbitrary
/// filter digests) are left to expire, a tunable staleness window rather
/// than a defect.
pub struct EntityCache {
    store: Arc<dyn CacheStore>,
    namespace: String,
    ttl: TtlTiers,
}

impl EntityCache {
    pub fn new(store: Arc<dyn CacheStore>, namespace: impl Into<String>, ttl: TtlTiers) -> Self {
        EntityCache {
            store,
            namespace: namespace.into(),
            ttl,
        }
    }

    fn entity_key(&self, id: &str) -> String {
        format!("cache:{}:{}", self.namespace, id)
    }

    fn list_key(&self, owner: &str) -> String {
        format!("cache:{}:list:{}", self.namespace, owner)
    }

    fn filtered_list_key(&self, owner: &str, digest: &str) -> String {
        format!("cache:{}:list:{}:{}", self.namespace, owner, digest)
    }

    fn popular_key(&self, limit: u16) -> String {
        format!("cache:{}:popular:{}", self.namespace, limit)
    }

    fn recommended_key(&self, user: &str, limit: u16) -> String {
        format!("cache:{}:recommended:{}:{}", self.namespace, user, limit)
    }

    /// Stable digest of a serializable filter, used to key filtered lists.
    pub fn filter_digest<F: Serialize>(filter: &F) -> String {
        let bytes = serde_json::to_vec(filter).unwrap_or_default();
        hex::encode(&Sha256::digest(&bytes)[..8])
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("dropping undecodable cache entry {key}: {e}");
                self.store.delete(key).await;
                None
            }
        }
    }

    async fn put_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        match serde_json::to_string(value) {
            Ok(raw) => self.store.set(key, &raw, ttl).await,
            Err(e) => {
                tracing::warn!("skipping unserializable cache entry {key}: {e}");
                false
            }
        }
    }

    pub async fn get_entity<T: DeserializeOwned>(&self, id: impl fmt::Display) -> Option<T> {
        self.get_json(&self.entity_key(&id.to_string())).await
    }

    pub async fn put_entity<T: Serialize>(&self, id: impl fmt::Display, value: &T) -> bool {
        self.put_json(&self.entity_key(&id.to_string()), value, self.ttl.entity)
            .await
    }

    pub async fn get_list<T: DeserializeOwned>(&self, owner: impl fmt::Display) -> Option<T> {
        self.get_json(&self.list_key(&owner.to_string())).await
    }

    pub async fn put_list<T: Serialize>(&self, owner: impl fmt::Display, value: &T) -> bool {
        self.put_json(&self.list_key(&owner.to_string()), value, self.ttl.list)
            .await
    }

    pub async fn get_filtered_list<T: DeserializeOwned, F: Serialize>(
        &self,
        owner: impl fmt::Display,
        filter: &F,
    ) -> Option<T> {
        let key = self.filtered_list_key(&owner.to_string(), &Self::filter_digest(filter));
        self.get_json(&key).await
    }

    pub async fn put_filtered_list<T: Serialize, F: Serialize>(
        &self,
        owner: impl fmt::Display,
        filter: &F,
        value: &T,
    ) -> bool {
        let key = self.filtered_list_key(&owner.to_string(), &Self::filter_digest(filter));
        self.put_json(&key, value, self.ttl.list).await
    }

    pub async fn get_popular<T: DeserializeOwned>(&self, limit: u16) -> Option<T> {
        self.get_json(&self.popular_key(limit)).await
    }

    pub async fn put_popular<T: Serialize>(&self, limit: u16, value: &T) -> bool {
        self.put_json(&self.popular_key(limit), value, self.ttl.ranking)
            .await
    }

    pub async fn get_recommended<T: DeserializeOwned>(
        &self,
        user: impl fmt::Display,
        limit: u16,
    ) -> Option<T> {
        self.get_json(&self.recommended_key(&user.to_string(), limit))
            .await
    }

    pub async fn put_recommended<T: Serialize>(
        &self,
        user: impl fmt::Display,
        limit: u16,
        value: &T,
    ) -> bool {
        self.put_json(
            &self.recommended_key(&user.to_string(), limit),
            value,
            self.ttl.ranking,
        )
        .await
    }

    /// Coarse invalidation for one entity id.
    pub async fn invalidate_entity(&self, id: impl fmt::Display) {
        let id = id.to_string();
        self.store.delete(&self.entity_key(&id)).await;
        self.store.delete(&self.list_key(&id)).await;
        self.store
            .delete(&self.popular_key(DEFAULT_RANKING_LIMIT))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::MemoryCacheStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        name: String,
        score: u64,
    }

    #[derive(Serialize)]
    struct Filter {
        scope: &'static str,
        status: Option<&'static str>,
    }

    fn cache() -> EntityCache {
        EntityCache::new(Arc::new(MemoryCacheStore::new()), "user", TtlTiers::default())
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = cache();
        let value = Snapshot {
            name: "alice".to_owned(),
            score: 7,
        };
        assert!(cache.put_entity(42, &value).await);
        assert_eq!(cache.get_entity::<Snapshot>(42).await, Some(value));
    }

    #[tokio::test]
    async fn invalidate_entity_turns_entity_and_list_into_misses() {
        let cache = cache();
        cache.put_entity(42, &1u64).await;
        cache.put_list(42, &vec![1u64, 2]).await;
        cache.put_popular(DEFAULT_RANKING_LIMIT, &vec![1u64]).await;

        cache.invalidate_entity(42).await;

        assert_eq!(cache.get_entity::<u64>(42).await, None);
        assert_eq!(cache.get_list::<Vec<u64>>(42).await, None);
        assert_eq!(
            cache.get_popular::<Vec<u64>>(DEFAULT_RANKING_LIMIT).await,
            None
        );
    }

    #[tokio::test]
    async fn filtered_keys_are_stable_per_filter_and_disjoint_across_filters() {
        let cache = cache();
        let pending = Filter {
            scope: "received",
            status: Some("pending"),
        };
        let all = Filter {
            scope: "received",
            status: None,
        };

        cache.put_filtered_list(42, &pending, &vec![1u64]).await;
        assert_eq!(
            cache.get_filtered_list::<Vec<u64>, _>(42, &pending).await,
            Some(vec![1])
        );
        assert_eq!(cache.get_filtered_list::<Vec<u64>, _>(42, &all).await, None);

        // filter digests survive re-serialization
        assert_eq!(
            EntityCache::filter_digest(&pending),
            EntityCache::filter_digest(&Filter {
                scope: "received",
                status: Some("pending"),
            })
        );
    }

    #[tokio::test]
    async fn unreachable_store_degrades_to_miss() {
        struct DownStore;

        #[async_trait::async_trait]
        impl CacheStore for DownStore {
            async fn get(&self, _key: &str) -> Option<String> {
                None
            }
            async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> bool {
                false
            }
            async fn delete(&self, _key: &str) -> bool {
                false
            }
        }

        let cache = EntityCache::new(Arc::new(DownStore), "user", TtlTiers::default());
        assert!(!cache.put_entity(42, &1u64).await);
        assert_eq!(cache.get_entity::<u64>(42).await, None);
    }
}
