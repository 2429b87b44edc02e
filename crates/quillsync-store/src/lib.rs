//! Quillsync Store - SQLite local persistence
//!
//! Reference implementation of the `ILocalStore` port on SQLite:
//! - Notebooks, tags, saved searches, notes, resources, linked notebooks
//!   and the user record
//! - Guid/name/scope lookups through indexed columns; full entities as
//!   serde-JSON payloads beside them
//! - WAL journal mode with an in-memory mode for tests

pub mod pool;
pub mod repository;

pub use pool::StorePool;
pub use repository::SqliteLocalStore;

use thiserror::Error;

/// Errors specific to the SQLite store adapter
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not open or create the database
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Any other query failure
    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),
}
