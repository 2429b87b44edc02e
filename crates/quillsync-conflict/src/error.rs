//! Conflict resolution errors

use quillsync_core::domain::DomainError;
use thiserror::Error;

/// Errors raised while resolving a single conflict
#[derive(Debug, Error)]
pub enum ConflictError {
    /// The remote entity lacks a field resolution requires
    #[error("remote entity is malformed: {0}")]
    MalformedRemote(String),

    /// The local copy lacks a field resolution requires
    #[error("local entity is malformed: {0}")]
    MalformedLocal(String),

    /// A follow-up local-store write failed
    #[error("local store write failed during conflict resolution: {0}")]
    StoreWrite(#[from] anyhow::Error),

    /// A domain value could not be constructed
    #[error(transparent)]
    Domain(#[from] DomainError),
}
