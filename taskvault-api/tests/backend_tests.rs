#![cfg(feature = "db-tests")]
//! PostgreSQL and Redis backend tests.
//!
//! Require a reachable database and Redis configured through the usual
//! `TASKVAULT_DB_*` and `TASKVAULT_REDIS_URL` variables.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use taskvault_api::config::RedisConfig;
use taskvault_api::db::{DbConfig, PgTaskStore};
use taskvault_api::migrations::{run_migrations, MIGRATIONS};
use taskvault_api::RedisTaskCache;
use taskvault_core::{StoreError, Task, TaskPatch, TaskStatus};
use taskvault_storage::{CacheSettings, DurableStore, EphemeralCache, TaskService};
use taskvault_test_utils::generators::{arb_new_task, arb_task_patch};
use tokio::runtime::Runtime;
use uuid::Uuid;

async fn pg_store() -> PgTaskStore {
    let config = DbConfig::from_env().expect("invalid database config");
    let store = PgTaskStore::from_config(&config).expect("Failed to create database pool");
    run_migrations(store.pool()).await.expect("migrations failed");
    store
}

async fn redis_cache() -> RedisTaskCache {
    let url = std::env::var("TASKVAULT_REDIS_URL")
        .unwrap_or_else(|_| RedisConfig::default().url);
    RedisTaskCache::connect(&RedisConfig { url })
        .await
        .expect("Failed to connect to Redis")
}

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let store = pg_store().await;
    assert_eq!(run_migrations(store.pool()).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_migrators_apply_once() {
    let config = DbConfig::from_env().expect("invalid database config");
    let first = PgTaskStore::from_config(&config).expect("Failed to create database pool");
    let second = PgTaskStore::from_config(&config).expect("Failed to create database pool");

    let (a, b) = tokio::join!(run_migrations(first.pool()), run_migrations(second.pool()));
    let applied = a.expect("first migrator failed") + b.expect("second migrator failed");
    assert!(applied <= MIGRATIONS.len());
    assert_eq!(run_migrations(first.pool()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_pg_store_crud() {
    let store = pg_store().await;
    let task = Task::create(taskvault_test_utils::fixtures::buy_milk());

    store.create(&task).await.unwrap();
    assert_eq!(
        store.create(&task).await.unwrap_err(),
        StoreError::Conflict { id: task.id }
    );

    let fetched = store.get_by_id(task.id).await.unwrap();
    assert_eq!(fetched.id, task.id);
    assert_eq!(fetched.title, task.title);

    let patch = TaskPatch::new().with_status(TaskStatus::Done).with_title("");
    store.update_by_id(task.id, &patch).await.unwrap();
    let fetched = store.get_by_id(task.id).await.unwrap();
    assert_eq!(fetched.status, TaskStatus::Done);
    assert_eq!(fetched.title, task.title);

    assert!(store.delete_by_id(task.id).await.unwrap());
    assert!(!store.delete_by_id(task.id).await.unwrap());
    assert!(store.get_by_id(task.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_pg_update_missing_is_not_found() {
    let store = pg_store().await;
    let id = Uuid::now_v7();
    assert_eq!(
        store
            .update_by_id(id, &TaskPatch::new().with_title("x"))
            .await
            .unwrap_err(),
        StoreError::NotFound { id }
    );
}

#[tokio::test]
async fn test_redis_roundtrip_and_expiry() {
    let cache = redis_cache().await;
    let key = format!("test:{}", Uuid::now_v7());

    cache.ping().await.unwrap();
    cache.set(&key, "value", Duration::from_secs(1)).await.unwrap();
    assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("value"));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.get(&key).await.unwrap(), None);

    cache.set(&key, "value", Duration::from_secs(60)).await.unwrap();
    cache.delete(&key).await.unwrap();
    cache.delete(&key).await.unwrap();
    assert_eq!(cache.get(&key).await.unwrap(), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Through real backends, a read always reflects the latest write.
    #[test]
    fn prop_service_reads_latest_write(new in arb_new_task(), patch in arb_task_patch()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = Arc::new(pg_store().await);
            let cache = Arc::new(redis_cache().await);
            let service = TaskService::new(
                store.clone(),
                cache,
                CacheSettings::new().with_key_prefix("prop"),
            );

            let created = service.create(new).await.map_err(|e| TestCaseError::fail(e.to_string()))?;
            if patch.is_empty() {
                return Ok(());
            }
            service
                .update_by_id(created.id, &patch)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            let mut expected = created.clone();
            patch.apply_to(&mut expected);
            let read = service
                .get_by_id(created.id)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(read.title, expected.title);
            prop_assert_eq!(read.status, expected.status);
            prop_assert_eq!(read.repeat, expected.repeat);

            service
                .delete_by_id(created.id)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert!(service.get_by_id(created.id).await.is_err());
            Ok(())
        })?;
    }
}
