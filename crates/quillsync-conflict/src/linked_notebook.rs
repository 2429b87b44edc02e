//! Linked notebook conflict resolution
//!
//! The local copy of a linked notebook is only a reference into another
//! user's account; there is nothing local worth preserving, so the remote
//! copy always wins.

use quillsync_core::domain::LinkedNotebook;

use crate::error::ConflictError;

/// One-shot resolver for linked-notebook conflicts
pub struct LinkedNotebookConflictResolver;

impl LinkedNotebookConflictResolver {
    /// Always resolves in favor of the remote copy.
    pub fn resolve(
        &self,
        remote: LinkedNotebook,
        _local: LinkedNotebook,
    ) -> Result<LinkedNotebook, ConflictError> {
        if remote.guid.is_none() {
            return Err(ConflictError::MalformedRemote(
                "linked notebook from sync chunk has no guid".to_string(),
            ));
        }
        Ok(remote)
    }
}
