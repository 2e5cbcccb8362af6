//! Storage for lock snapshots, history and pending updates.
//!
//! The engine only ever sees the [`Repository`] trait. Two implementations
//! ship here: [`PgRepository`] for deployments and [`MemoryRepository`] for
//! tests and one-shot runs.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

pub mod memory;
pub mod pg;
pub mod repository;
pub mod rows;

pub use memory::MemoryRepository;
pub use pg::PgRepository;
pub use repository::Repository;
pub use rows::{
    CredentialId, HistoryEntry, LockUpdate, ParseUpdateTypeError, Snapshot, UpdateType,
};

pub const ENV_DB_URL: &str = "LKS_DATABASE_URL";

/// Connect to Postgres using LKS_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    info!("db/migrated");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_snapshots_table: bool,
}

pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='lock_snapshots'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_snapshots_table: exists,
    })
}
