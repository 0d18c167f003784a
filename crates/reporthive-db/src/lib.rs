//! Reporthive Database - SQLite persistence layer
//!
//! One [`Database`] per job. Table operations live in per-table modules and
//! take an explicit connection, so a caller can run several of them inside
//! one transaction; acquiring and releasing the connection is always the
//! caller's responsibility (release happens on drop, on every path).

pub mod branches;
pub mod builds;
pub mod general;
pub mod schema;
pub mod subproject_builds;
pub mod subprojects;

use reporthive_core::{Error, JobFlavor, Result};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use tracing::info;

pub use builds::{BuildRecord, NewBuild};
pub use general::GeneralInfo;
pub use subproject_builds::SubprojectRun;

/// Database connection pool for one job.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) a job database and apply the schema.
    pub async fn open(path: &Path, flavor: JobFlavor) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(Error::connection)?;

        sqlx::query(schema::SCHEMA_BASE)
            .execute(&pool)
            .await
            .map_err(Error::store)?;

        if flavor.is_multi() {
            sqlx::query(schema::SCHEMA_MULTI)
                .execute(&pool)
                .await
                .map_err(Error::store)?;
        }

        info!("Database initialized at {}", path.display());
        Ok(Self { pool })
    }

    /// Acquire a connection for one logical operation.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        self.pool.acquire().await.map_err(Error::connection)
    }

    /// Begin a transaction; dropping it without commit rolls back.
    pub async fn begin(&self) -> Result<Transaction<'_, Sqlite>> {
        self.pool.begin().await.map_err(Error::connection)
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
