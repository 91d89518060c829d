//! Postgres connection and schema.
//!
//! ## Schema
//!
//! ```sql
//! tokens              (id PK, user_id, issued_at, expires_at, signature, revoked)
//! projects            (id PK, title, owner_id, created_at)
//! project_permissions (project_id, user_id, capability) PK over all three
//! users               (id PK, username UNIQUE, password_hash, created_at)
//! ```
//!
//! `project_permissions` deliberately has no foreign key to `projects`:
//! granting is a single insert and does not check that the project exists.
//!
//! ## Error Mapping
//!
//! Every SQLx failure surfaces as [`RepositoryError::Unavailable`]. Missing
//! rows are detected by the queries themselves (`fetch_optional`), never by
//! `RowNotFound`.

use anyhow::Context;
use sqlx::PgPool;
use tracing::info;

use comicverse_core::RepositoryError;

/// Open a pool and make sure the schema exists.
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to Postgres")?;
    ensure_schema(&pool).await?;
    info!("postgres schema ready");
    Ok(pool)
}

const SCHEMA_LOCK_KEY: i64 = 0x636f_6d69_6376;

/// Create tables and indexes if they are missing. Idempotent.
pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    const STATEMENTS: [(&str, &str); 6] = [
        (
            "tokens",
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                id          UUID PRIMARY KEY,
                user_id     UUID NOT NULL,
                issued_at   TIMESTAMPTZ NOT NULL,
                expires_at  TIMESTAMPTZ NOT NULL,
                signature   BYTEA NOT NULL,
                revoked     BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        ),
        (
            "tokens_user_id_idx",
            "CREATE INDEX IF NOT EXISTS tokens_user_id_idx ON tokens (user_id) WHERE NOT revoked",
        ),
        (
            "projects",
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id          UUID PRIMARY KEY,
                title       TEXT NOT NULL,
                owner_id    UUID NOT NULL,
                created_at  TIMESTAMPTZ NOT NULL
            )
            "#,
        ),
        (
            "projects_owner_idx",
            "CREATE INDEX IF NOT EXISTS projects_owner_idx ON projects (owner_id, created_at DESC)",
        ),
        (
            "project_permissions",
            r#"
            CREATE TABLE IF NOT EXISTS project_permissions (
                project_id  UUID NOT NULL,
                user_id     UUID NOT NULL,
                capability  TEXT NOT NULL,
                PRIMARY KEY (project_id, user_id, capability)
            )
            "#,
        ),
        (
            "users",
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id             UUID PRIMARY KEY,
                username       TEXT NOT NULL UNIQUE,
                password_hash  TEXT NOT NULL,
                created_at     TIMESTAMPTZ NOT NULL
            )
            "#,
        ),
    ];

    // Concurrent `CREATE ... IF NOT EXISTS` can still collide in the catalog,
    // so starters take turns on an advisory lock held for the transaction.
    let mut tx = pool.begin().await.context("failed to begin schema transaction")?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await
        .context("failed to take schema lock")?;
    for (name, sql) in STATEMENTS {
        sqlx::query(sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to create {name}"))?;
    }
    tx.commit().await.context("failed to commit schema")?;
    Ok(())
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => RepositoryError::unavailable(format!(
            "database error in {operation}: {}",
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            RepositoryError::unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            RepositoryError::unavailable(format!("connection pool timed out in {operation}"))
        }
        other => RepositoryError::unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

pub(crate) fn poisoned() -> RepositoryError {
    RepositoryError::unavailable("lock poisoned")
}
