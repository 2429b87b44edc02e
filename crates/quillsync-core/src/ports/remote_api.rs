//! Remote service ports (driven/secondary ports)
//!
//! Interfaces to the note service's user store and note store. The wire
//! protocol (Thrift over HTTPS in the real service) is an adapter concern;
//! the engine only depends on these traits.
//!
//! ## Design Notes
//!
//! - Unlike the local-store port, these return a typed [`RemoteError`]:
//!   the engine must pattern-match rate-limit and auth-expired outcomes to
//!   schedule retries and token refreshes (they are flow control, not
//!   failures).
//! - Every method is a suspension point for the engine; calls may be
//!   retried with identical arguments after a rate-limit wait, and the
//!   service guarantees that such a retry yields the same semantic result.

use thiserror::Error;

use crate::domain::{
    AccountLimits, AuthToken, ErrorString, Guid, LinkedNotebook, Note, Resource, ServiceLevel,
    SyncChunk, SyncChunkFilter, SyncState, User, Usn,
};

/// Outcome classification for every remote call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The service throttled the caller; retry after the given number of
    /// seconds. A negative duration is a protocol violation.
    #[error("rate limit reached, retry after {duration_seconds} seconds")]
    RateLimitReached {
        /// Seconds to wait before retrying
        duration_seconds: i32,
    },

    /// The authentication token for the current scope has expired
    #[error("authentication token expired")]
    AuthExpired,

    /// The response is missing fields the protocol requires
    #[error("malformed data from the service: {0}")]
    DataShape(ErrorString),

    /// Any other service-reported error
    #[error("service error: {0}")]
    Api(ErrorString),
}

impl RemoteError {
    /// Convenience constructor for data-shape violations
    pub fn data_shape(message: impl Into<String>) -> Self {
        Self::DataShape(ErrorString::new(message))
    }

    /// Convenience constructor for generic service errors
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(ErrorString::new(message))
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Options for a full note fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteFetchOptions {
    pub with_content: bool,
    pub with_resources_data: bool,
    pub with_resources_recognition: bool,
    pub with_resources_alternate_data: bool,
}

impl NoteFetchOptions {
    /// Everything the engine needs when lazily downloading a note
    pub fn full() -> Self {
        Self {
            with_content: true,
            with_resources_data: true,
            with_resources_recognition: true,
            with_resources_alternate_data: true,
        }
    }
}

/// Options for a standalone resource fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceFetchOptions {
    pub with_data: bool,
    pub with_recognition: bool,
    pub with_alternate_data: bool,
}

impl ResourceFetchOptions {
    pub fn full() -> Self {
        Self {
            with_data: true,
            with_recognition: true,
            with_alternate_data: true,
        }
    }
}

/// Port trait for the service's user store.
#[async_trait::async_trait]
pub trait IUserStore: Send + Sync {
    /// Verifies that this client's protocol version is still accepted by
    /// the service. Returns `false` when the service has retired it.
    async fn check_version(
        &self,
        client_name: &str,
        edam_version_major: i16,
        edam_version_minor: i16,
    ) -> RemoteResult<bool>;

    /// Fetches the authenticated user's account record
    async fn get_user(&self, auth_token: &AuthToken) -> RemoteResult<User>;

    /// Fetches the quota set for the given service level
    async fn get_account_limits(
        &self,
        service_level: ServiceLevel,
        auth_token: &AuthToken,
    ) -> RemoteResult<AccountLimits>;
}

/// Port trait for the service's note store.
///
/// Linked-notebook variants target the sharer's note store (selected by
/// the linked notebook's `note_store_url`) under that scope's own token.
#[async_trait::async_trait]
pub trait INoteStore: Send + Sync {
    /// Sync state of the user's own scope
    async fn get_sync_state(&self, auth_token: &AuthToken) -> RemoteResult<SyncState>;

    /// Downloads one chunk of the user's own scope starting after
    /// `after_usn`
    async fn get_sync_chunk(
        &self,
        after_usn: Usn,
        max_entries: i32,
        filter: &SyncChunkFilter,
        auth_token: &AuthToken,
    ) -> RemoteResult<SyncChunk>;

    /// Sync state of a linked notebook's scope
    async fn get_linked_notebook_sync_state(
        &self,
        linked_notebook: &LinkedNotebook,
        auth_token: &AuthToken,
    ) -> RemoteResult<SyncState>;

    /// Downloads one chunk of a linked notebook's scope
    async fn get_linked_notebook_sync_chunk(
        &self,
        linked_notebook: &LinkedNotebook,
        after_usn: Usn,
        max_entries: i32,
        full_sync_only: bool,
        auth_token: &AuthToken,
    ) -> RemoteResult<SyncChunk>;

    /// Fetches a note with content and resources per `options`
    async fn get_note(
        &self,
        guid: &Guid,
        options: &NoteFetchOptions,
        auth_token: &AuthToken,
    ) -> RemoteResult<Note>;

    /// Fetches a standalone resource per `options`
    async fn get_resource(
        &self,
        guid: &Guid,
        options: &ResourceFetchOptions,
        auth_token: &AuthToken,
    ) -> RemoteResult<Resource>;
}
