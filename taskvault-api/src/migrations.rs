//! Embedded schema migrations.
//!
//! Migrations are compiled into the binary and applied in version order at
//! startup. Applied versions are recorded in `schema_migrations`, so running
//! them again is a no-op.

use deadpool_postgres::Pool;
use tracing::info;

use crate::error::ApiResult;

/// A single forward-only migration.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// All migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create_tasks",
    sql: include_str!("../migrations/0001_create_tasks.sql"),
}];

/// Serializes concurrent migrators across instances.
const MIGRATION_LOCK_KEY: i64 = 0x7461_736b_7661_756c;

const CREATE_LEDGER: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version     BIGINT PRIMARY KEY,
    name        TEXT NOT NULL,
    applied_at  TIMESTAMPTZ NOT NULL DEFAULT now()
)";

/// Apply every pending migration. Returns how many were applied.
///
/// The whole run, ledger creation included, happens inside one transaction
/// holding the advisory lock, so concurrent callers apply each version once.
pub async fn run_migrations(pool: &Pool) -> ApiResult<usize> {
    let mut conn = pool.get().await?;

    let tx = conn.transaction().await?;
    tx.execute("SELECT pg_advisory_xact_lock($1)", &[&MIGRATION_LOCK_KEY])
        .await?;
    tx.batch_execute(CREATE_LEDGER).await?;

    let mut applied = 0;
    for migration in MIGRATIONS {
        let done = tx
            .query_opt(
                "SELECT 1 FROM schema_migrations WHERE version = $1",
                &[&migration.version],
            )
            .await?
            .is_some();
        if done {
            continue;
        }

        tx.batch_execute(migration.sql).await?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES ($1, $2)",
            &[&migration.version, &migration.name],
        )
        .await?;
        info!(version = migration.version, name = migration.name, "applied migration");
        applied += 1;
    }

    tx.commit().await?;
    Ok(applied)
}
