//! Engine error types
//!
//! Transient conditions (rate limit, expired auth) never surface here;
//! they are absorbed by the retry layer. Everything below terminates the
//! sync session.

use quillsync_core::domain::ErrorString;
use quillsync_conflict::ConflictError;
use thiserror::Error;

/// Terminal failures of a sync session
#[derive(Debug, Error)]
pub enum SyncError {
    /// The session was cancelled through `stop()`
    #[error("synchronization was stopped")]
    Stopped,

    /// `start` was called before the last-sync parameters were supplied
    #[error("last synchronization parameters were not provided")]
    MissingSyncParameters,

    /// The service no longer accepts this client's protocol version
    #[error("the client protocol version is no longer usable: {0}")]
    ProtocolVersion(ErrorString),

    /// The service or local store handed back malformed data
    #[error("malformed data: {0}")]
    DataShape(ErrorString),

    /// Non-transient remote error
    #[error("remote service failure: {0}")]
    Remote(ErrorString),

    /// Local store write or read failure
    #[error("local store failure: {0}")]
    Store(#[from] anyhow::Error),

    /// A conflict resolver failed
    #[error("conflict resolution failure: {0}")]
    Conflict(#[from] ConflictError),

    /// Token broker failure
    #[error("authentication failure: {0}")]
    Auth(ErrorString),
}

impl SyncError {
    /// Renders this error as the structured message carried by the
    /// `Failure` event.
    pub fn to_error_string(&self) -> ErrorString {
        match self {
            SyncError::Stopped => ErrorString::new("synchronization was stopped"),
            SyncError::MissingSyncParameters => {
                ErrorString::new("last synchronization parameters were not provided")
            }
            SyncError::ProtocolVersion(inner) => {
                inner.wrapped("the client protocol version is no longer usable")
            }
            SyncError::DataShape(inner) => inner.wrapped("malformed data"),
            SyncError::Remote(inner) => inner.wrapped("remote service failure"),
            SyncError::Store(err) => {
                ErrorString::new("local store failure").with_details(format!("{err:#}"))
            }
            SyncError::Conflict(err) => {
                ErrorString::new("conflict resolution failure").with_details(err.to_string())
            }
            SyncError::Auth(inner) => inner.wrapped("authentication failure"),
        }
    }

    /// Convenience constructor for data-shape failures
    pub fn data_shape(message: impl Into<String>) -> Self {
        Self::DataShape(ErrorString::new(message))
    }
}
