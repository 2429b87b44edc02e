//! Authentication token broker port (driven/secondary port)
//!
//! The engine never acquires credentials itself; it asks the broker for
//! the current primary token and for per-linked-notebook tokens, and asks
//! it to refresh them when the service reports expiry. How the broker
//! obtains tokens (OAuth, keychain, test fixture) is a caller concern.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{AuthToken, Guid, LinkedNotebook, ShardId};

/// A token together with the context needed to use it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthData {
    pub token: AuthToken,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
    /// Shard the token is valid for
    pub shard_id: Option<ShardId>,
    /// Note-store URL the token is bound to
    pub note_store_url: Option<String>,
}

impl AuthData {
    /// Returns true if the token expires within the given duration
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

/// Port trait for token acquisition and refresh.
#[async_trait::async_trait]
pub trait IAuthTokenBroker: Send + Sync {
    /// Current token for the user's own account
    async fn user_auth_token(&self) -> anyhow::Result<AuthToken>;

    /// Forces a refresh of the user's own token; resolves once the new
    /// token is available
    async fn refresh_user_auth_token(&self) -> anyhow::Result<AuthToken>;

    /// Token for one linked notebook's scope
    async fn linked_notebook_auth(
        &self,
        linked_notebook: &LinkedNotebook,
    ) -> anyhow::Result<AuthData>;

    /// Refreshes tokens for all the given linked notebooks at once,
    /// returning them keyed by linked-notebook guid
    async fn refresh_linked_notebook_auth(
        &self,
        linked_notebooks: &[LinkedNotebook],
    ) -> anyhow::Result<HashMap<Guid, AuthData>>;
}
