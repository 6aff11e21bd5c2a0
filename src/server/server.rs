use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::server::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

/// Composition root. Leaves are built first and passed down explicitly;
/// nothing holds module-level state.
pub struct Server {
    pub relationship_service: Arc<dyn RelationshipService>,
    pub notification_service: Arc<dyn NotificationService>,
    pub notification_dispatcher: Arc<dyn NotificationDispatcher>,
    pub session_hub: Arc<SessionHub>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let mut pool = None;

        let (connection_repo, notification_repo, user_repo): (
            Arc<dyn ConnectionRepo>,
            Arc<dyn NotificationRepo>,
            Arc<dyn UserRepo>,
        ) = match settings.storage.backend.as_str() {
            "mysql" => {
                let mysql_pool = Pool::<MySql>::connect(&settings.storage.mysql_dsn).await?;
                pool = Some(mysql_pool.clone());
                (
                    Arc::new(MySqlConnectionRepo::new(mysql_pool.clone())),
                    Arc::new(MySqlNotificationRepo::new(mysql_pool.clone())),
                    Arc::new(MySqlUserRepo::new(mysql_pool)),
                )
            }
            "memory" => {
                let users = Arc::new(MemoryUserRepo::new());
                (
                    Arc::new(MemoryConnectionRepo::new(users.clone())),
                    Arc::new(MemoryNotificationRepo::new()),
                    users,
                )
            }
            other => return Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        };

        let cache_store: Arc<dyn CacheStore> = match settings.cache.backend.as_str() {
            "redis" => {
                let redis_client = redis::Client::open(settings.cache.redis_dsn.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisCacheStore::new(redis_manager))
            }
            "memory" => Arc::new(MemoryCacheStore::new()),
            other => return Err(anyhow::anyhow!("Unknown cache backend: {}", other)),
        };
        let cache = Arc::new(EntityCache::new(
            cache_store,
            "connections",
            TtlTiers {
                entity: Duration::from_secs(settings.cache.entity_ttl_secs),
                list: Duration::from_secs(settings.cache.list_ttl_secs),
                ranking: Duration::from_secs(settings.cache.ranking_ttl_secs),
            },
        ));

        let session_hub = Arc::new(SessionHub::new());
        let live_channel: Arc<dyn LiveChannel> = session_hub.clone();

        let notification_service: Arc<dyn NotificationService> =
            Arc::new(RealNotificationService::new(notification_repo));

        let notification_dispatcher: Arc<dyn NotificationDispatcher> = Arc::new(
            NotificationFanout::new(notification_service.clone(), live_channel),
        );

        let relationship_service: Arc<dyn RelationshipService> =
            Arc::new(RealRelationshipService::new(
                connection_repo,
                user_repo,
                notification_dispatcher.clone(),
                cache,
            ));

        info!("server started");

        Ok(Self {
            relationship_service,
            notification_service,
            notification_dispatcher,
            session_hub,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.session_hub.shutdown().await;
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
