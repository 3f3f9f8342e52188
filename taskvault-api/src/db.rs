//! Database Connection Pool and PostgreSQL Task Store
//!
//! This module provides PostgreSQL connection pooling using deadpool-postgres
//! and [`PgTaskStore`], the durable store implementation backed by the
//! `tasks` table.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, PoolError, RecyclingMethod, Runtime, Timeouts,
};
use serde::{Deserialize, Serialize};
use taskvault_core::{
    ConfigError, RepeatKind, StoreError, StoreResult, Task, TaskId, TaskPatch, TaskStatus,
};
use taskvault_storage::DurableStore;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

use crate::config::{flag_var, parse_var, string_var};
use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection wait/create/recycle timeout in seconds
    pub timeout_secs: u64,
    /// Apply embedded migrations at startup
    pub run_migrations: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "task_manager".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            max_size: 16,
            timeout_secs: 30,
            run_migrations: true,
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&crate::config::env_lookup)
    }

    /// Environment variables:
    /// - `TASKVAULT_DB_HOST` (default: localhost)
    /// - `TASKVAULT_DB_PORT` (default: 5432)
    /// - `TASKVAULT_DB_NAME` (default: task_manager)
    /// - `TASKVAULT_DB_USER` (default: postgres)
    /// - `TASKVAULT_DB_PASSWORD` (default: postgres)
    /// - `TASKVAULT_DB_POOL_SIZE` (default: 16)
    /// - `TASKVAULT_DB_TIMEOUT` seconds (default: 30)
    /// - `TASKVAULT_DB_RUN_MIGRATIONS` (default: true)
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: string_var(lookup, "TASKVAULT_DB_HOST", &defaults.host),
            port: parse_var(lookup, "TASKVAULT_DB_PORT", defaults.port)?,
            dbname: string_var(lookup, "TASKVAULT_DB_NAME", &defaults.dbname),
            user: string_var(lookup, "TASKVAULT_DB_USER", &defaults.user),
            password: string_var(lookup, "TASKVAULT_DB_PASSWORD", &defaults.password),
            max_size: parse_var(lookup, "TASKVAULT_DB_POOL_SIZE", defaults.max_size)?,
            timeout_secs: parse_var(lookup, "TASKVAULT_DB_TIMEOUT", defaults.timeout_secs)?,
            run_migrations: flag_var(
                lookup,
                "TASKVAULT_DB_RUN_MIGRATIONS",
                defaults.run_migrations,
            )?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "database.host".to_string(),
            });
        }
        if self.dbname.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "database.dbname".to_string(),
            });
        }
        if self.max_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.max_size".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Create a connection pool from this configuration.
    ///
    /// Connections are opened lazily, so this succeeds without a reachable
    /// server.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut timeouts = Timeouts::default();
        timeouts.wait = Some(self.timeout());
        timeouts.create = Some(self.timeout());
        timeouts.recycle = Some(self.timeout());
        let mut pool_cfg = PoolConfig::new(self.max_size);
        pool_cfg.timeouts = timeouts;
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// POSTGRES TASK STORE
// ============================================================================

const TASK_COLUMNS: &str =
    "id, user_id, title, description, status, created_at, repeatable, parent_task_id";

/// Durable task store backed by the `tasks` table.
#[derive(Clone)]
pub struct PgTaskStore {
    pool: Pool,
}

impl std::fmt::Debug for PgTaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PgTaskStore")
            .field("pool_size", &status.size)
            .field("pool_available", &status.available)
            .finish()
    }
}

impl PgTaskStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn get_conn(&self) -> StoreResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }
}

fn pool_error(err: PoolError) -> StoreError {
    match err {
        PoolError::Timeout(kind) => {
            StoreError::unavailable(format!("connection pool timed out ({:?})", kind))
        }
        PoolError::Closed => StoreError::unavailable("connection pool is closed"),
        other => StoreError::unavailable(format!("cannot acquire connection: {}", other)),
    }
}

fn query_error(err: tokio_postgres::Error) -> StoreError {
    StoreError::unavailable(err.to_string())
}

fn row_to_task(row: &Row) -> StoreResult<Task> {
    let status: String = row.try_get("status").map_err(query_error)?;
    let repeat: String = row.try_get("repeatable").map_err(query_error)?;

    Ok(Task {
        id: row.try_get("id").map_err(query_error)?,
        user_id: row.try_get("user_id").map_err(query_error)?,
        title: row.try_get("title").map_err(query_error)?,
        description: row.try_get("description").map_err(query_error)?,
        status: TaskStatus::from_db_str(&status)
            .map_err(|e| StoreError::unavailable(format!("corrupt task row: {}", e)))?,
        created_at: row.try_get("created_at").map_err(query_error)?,
        repeat: RepeatKind::from_db_str(&repeat)
            .map_err(|e| StoreError::unavailable(format!("corrupt task row: {}", e)))?,
        parent_task_id: row.try_get("parent_task_id").map_err(query_error)?,
    })
}

#[async_trait]
impl DurableStore for PgTaskStore {
    async fn create(&self, task: &Task) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "INSERT INTO tasks ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            TASK_COLUMNS
        );

        let result = conn
            .execute(
                sql.as_str(),
                &[
                    &task.id,
                    &task.user_id,
                    &task.title,
                    &task.description,
                    &task.status.as_db_str(),
                    &task.created_at,
                    &task.repeat.as_db_str(),
                    &task.parent_task_id,
                ],
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                Err(StoreError::Conflict { id: task.id })
            }
            Err(e) => Err(query_error(e)),
        }
    }

    async fn get_by_id(&self, id: TaskId) -> StoreResult<Task> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);

        let row = conn
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(query_error)?
            .ok_or(StoreError::NotFound { id })?;

        row_to_task(&row)
    }

    async fn update_by_id(&self, id: TaskId, patch: &TaskPatch) -> StoreResult<()> {
        let conn = self.get_conn().await?;

        // Empty strings and NULLs both keep the stored value.
        let affected = conn
            .execute(
                "UPDATE tasks SET \
                     title = COALESCE(NULLIF($2, ''), title), \
                     description = COALESCE(NULLIF($3, ''), description), \
                     status = COALESCE(NULLIF($4, ''), status), \
                     repeatable = COALESCE(NULLIF($5, ''), repeatable) \
                 WHERE id = $1",
                &[
                    &id,
                    &patch.title(),
                    &patch.description(),
                    &patch.status.as_ref().map(TaskStatus::as_db_str),
                    &patch.repeat.as_ref().map(RepeatKind::as_db_str),
                ],
            )
            .await
            .map_err(query_error)?;

        if affected == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: TaskId) -> StoreResult<bool> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute("DELETE FROM tasks WHERE id = $1", &[&id])
            .await
            .map_err(query_error)?;
        Ok(affected > 0)
    }

    async fn ping(&self) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        conn.simple_query("SELECT 1").await.map_err(query_error)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::from_lookup(&|_| None).unwrap();
        assert_eq!(config, DbConfig::default());
        assert_eq!(config.dbname, "task_manager");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.run_migrations);
    }

    #[test]
    fn test_db_config_rejects_zero_pool() {
        let config = DbConfig {
            max_size: 0,
            ..DbConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_create_pool_is_lazy() {
        let config = DbConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..DbConfig::default()
        };
        let store = PgTaskStore::from_config(&config).unwrap();
        assert_eq!(store.pool_size(), 0);
        assert_eq!(store.backend_name(), "postgres");
    }

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            pool_error(PoolError::Closed),
            StoreError::Unavailable { .. }
        ));
    }
}
