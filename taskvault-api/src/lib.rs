//! Taskvault API - HTTP Layer and Backends
//!
//! Exposes the cache-coordinated task service over REST (Axum), with a
//! PostgreSQL durable store and a Redis ephemeral cache. In-memory backends
//! can be selected through configuration for local runs and tests.

pub mod config;
pub mod db;
pub mod error;
pub mod macros;
pub mod migrations;
pub mod redis_cache;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use taskvault_storage::{
    DurableStore, EphemeralCache, InMemoryCache, InMemoryTaskStore, NoOpCache, TaskService,
};
use tracing::{info, warn};

// Re-export commonly used types
pub use config::{AppConfig, CacheBackendKind, HttpConfig, StoreBackendKind, TenancyConfig};
pub use db::{DbConfig, PgTaskStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use redis_cache::RedisTaskCache;
pub use routes::create_api_router;
pub use state::AppState;
pub use types::*;

/// How long startup waits for Redis before running without a cache.
pub const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Build the task service from configuration.
///
/// Applies pending migrations when the PostgreSQL store is selected and
/// `database.run_migrations` is set. An unreachable Redis is not fatal: the
/// service starts with [`NoOpCache`] and every read goes to the store.
pub async fn build_service(config: &AppConfig) -> ApiResult<TaskService> {
    let store: Arc<dyn DurableStore> = match config.store.backend {
        StoreBackendKind::Postgres => {
            let store = PgTaskStore::from_config(&config.database)?;
            if config.database.run_migrations {
                let applied = migrations::run_migrations(store.pool()).await?;
                info!(applied, "schema migrations complete");
            }
            Arc::new(store)
        }
        StoreBackendKind::Memory => {
            warn!("using in-memory task store, data is lost on restart");
            Arc::new(InMemoryTaskStore::new())
        }
    };

    let cache: Arc<dyn EphemeralCache> = match config.cache.backend {
        CacheBackendKind::Redis => connect_redis(config).await,
        CacheBackendKind::Memory => Arc::new(InMemoryCache::with_capacity(config.cache.max_entries)),
        CacheBackendKind::None => Arc::new(NoOpCache::new()),
    };

    info!(
        store = store.backend_name(),
        cache = cache.provider_name(),
        ttl_secs = config.cache.ttl_secs,
        "task service ready"
    );

    Ok(TaskService::new(store, cache, config.cache.settings()))
}

async fn connect_redis(config: &AppConfig) -> Arc<dyn EphemeralCache> {
    match tokio::time::timeout(REDIS_CONNECT_TIMEOUT, RedisTaskCache::connect(&config.redis)).await
    {
        Ok(Ok(cache)) => Arc::new(cache),
        Ok(Err(e)) => {
            warn!(error = %e, "Redis unavailable, running without cache");
            Arc::new(NoOpCache::new())
        }
        Err(_) => {
            warn!(
                timeout = ?REDIS_CONNECT_TIMEOUT,
                "Redis connect timed out, running without cache"
            );
            Arc::new(NoOpCache::new())
        }
    }
}

/// Build the full application router.
pub async fn build_app(config: &AppConfig) -> ApiResult<axum::Router> {
    let service = build_service(config).await?;
    let state = AppState::new(service, config.tenancy.clone());
    Ok(create_api_router(state, &config.http))
}
