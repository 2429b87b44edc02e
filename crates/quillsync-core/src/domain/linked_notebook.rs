//! Linked notebook entity

use serde::{Deserialize, Serialize};

use super::newtypes::{Guid, ShardId, Usn};

/// A reference in the user's account pointing at a notebook owned by
/// another user. Its content lives under a separate authentication scope
/// with its own USN stream; the engine syncs each linked notebook as an
/// independent scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkedNotebook {
    pub guid: Option<Guid>,
    pub update_sequence_num: Option<Usn>,
    /// Display name of the share
    pub share_name: Option<String>,
    /// Owner's username
    pub username: Option<String>,
    pub shard_id: Option<ShardId>,
    /// Global identifier of the shared notebook on the owner's shard
    pub shared_notebook_global_id: Option<String>,
    /// Public uri for shares that need no authentication
    pub uri: Option<String>,
    /// Note-store URL to use for this scope's API calls
    pub note_store_url: Option<String>,
    pub web_api_url_prefix: Option<String>,
}

impl LinkedNotebook {
    /// Returns true for public shares, which are accessed without an
    /// authentication token.
    pub fn is_public(&self) -> bool {
        self.uri.is_some() && self.shared_notebook_global_id.is_none()
    }
}
