//! SQLite connection handling
//!
//! The local store runs on a small connection pool. WAL journaling keeps
//! reads from queueing behind the single writer, and with WAL in place
//! `synchronous = NORMAL` is the right durability trade for a cache that
//! can always be rebuilt from the service. The schema ships inside the
//! binary and is applied on every open; `CREATE TABLE IF NOT EXISTS`
//! makes that idempotent.

use std::path::Path;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{debug, info};

use crate::StoreError;

/// The engine issues one write at a time per entity kind; a handful of
/// connections covers concurrent readers.
const POOL_SIZE: u32 = 4;

/// How long a connection waits on a locked database before giving up
const LOCK_WAIT: std::time::Duration = std::time::Duration::from_secs(10);

/// Schema, applied idempotently on every open
const SCHEMA_SQL: &str = include_str!("migrations/20260715_initial.sql");

/// Pool of SQLite connections backing [`crate::SqliteLocalStore`].
pub struct StorePool {
    pool: SqlitePool,
}

impl StorePool {
    /// Opens the store database at `db_path`, creating the file, its
    /// parent directories and the schema as needed.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "cannot prepare store directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(LOCK_WAIT);

        let pool = SqlitePoolOptions::new()
            .max_connections(POOL_SIZE)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "cannot open local store at {}: {e}",
                    db_path.display()
                ))
            })?;

        Self::apply_schema(&pool).await?;

        info!(path = %db_path.display(), connections = POOL_SIZE, "Local store opened");
        Ok(Self { pool })
    }

    /// Opens a throwaway in-memory store for tests.
    ///
    /// Pinned to a single connection: every SQLite in-memory connection
    /// sees its own private database, so a second connection would find
    /// an empty one.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("cannot open in-memory store: {e}"))
            })?;

        Self::apply_schema(&pool).await?;

        debug!("In-memory local store opened");
        Ok(Self { pool })
    }

    /// Returns the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn apply_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("schema setup failed: {e}")))?;
        debug!("Local store schema applied");
        Ok(())
    }
}
