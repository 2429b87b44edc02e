//! Note conflict resolution
//!
//! Notes are the one entity kind where local work is preserved wholesale:
//! when a locally modified note collides with a remote update, the local
//! version is forked into a *conflicting-note copy* (a brand-new local
//! note with no server identity) and the remote version then lands at the
//! original local id. The copy records where it came from through
//! `conflict_source_note_guid`.

use std::collections::HashSet;
use std::sync::Arc;

use quillsync_core::domain::{Guid, LocalId, Note};
use quillsync_core::ports::ILocalStore;
use tracing::{debug, info};

use crate::error::ConflictError;
use crate::namer::ConflictNamer;

/// Outcome of resolving one note conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteResolution {
    /// The local copy is current; the remote note is skipped entirely
    KeepLocal,
    /// Fetch the remote note in full and write it over this local id
    TakeRemote {
        /// Surviving local id the remote note must land under
        local_id: LocalId,
    },
}

/// One-shot resolver for note conflicts
pub struct NoteConflictResolver {
    local_store: Arc<dyn ILocalStore>,
}

impl NoteConflictResolver {
    pub fn new(local_store: Arc<dyn ILocalStore>) -> Self {
        Self { local_store }
    }

    /// Resolves a conflict between a remote note from a sync chunk and the
    /// local note found under the same guid.
    ///
    /// `expunged_notebook_guids` carries the notebook guids the current
    /// chunk set is about to expunge; a conflicting-note copy must not be
    /// left inside a notebook that is about to disappear.
    pub async fn resolve(
        &self,
        remote: &Note,
        local: Note,
        expunged_notebook_guids: &HashSet<Guid>,
    ) -> Result<NoteResolution, ConflictError> {
        let remote_guid = remote.guid.as_ref().ok_or_else(|| {
            ConflictError::MalformedRemote("note from sync chunk has no guid".to_string())
        })?;
        let remote_usn = remote.update_sequence_num.ok_or_else(|| {
            ConflictError::MalformedRemote("note from sync chunk has no USN".to_string())
        })?;

        if local.guid.as_ref() == Some(remote_guid) {
            if let Some(local_usn) = local.update_sequence_num {
                if local_usn >= remote_usn {
                    debug!(
                        guid = %remote_guid,
                        local_usn,
                        remote_usn,
                        "Local note is current, skipping remote copy"
                    );
                    return Ok(NoteResolution::KeepLocal);
                }
            }
        }

        let local_id = local.local_id;

        if local.locally_modified {
            info!(
                guid = %remote_guid,
                title = ?local.title,
                "Local note diverged, creating conflicting copy"
            );
            let copy = conflicting_copy(&local, remote, expunged_notebook_guids);
            self.local_store.add_note(&copy).await?;
        }

        Ok(NoteResolution::TakeRemote { local_id })
    }
}

/// Builds the conflicting-note copy of `local`.
///
/// The copy is a new local note: fresh local id, no guid, no USN, dirty so
/// the caller's next upload pushes it, resources re-parented under new
/// local ids with their server identity cleared (a note without a guid
/// cannot own resources with guids).
fn conflicting_copy(local: &Note, remote: &Note, expunged_notebook_guids: &HashSet<Guid>) -> Note {
    let mut copy = local.clone();
    copy.local_id = LocalId::new();
    copy.guid = None;
    copy.update_sequence_num = None;
    copy.locally_modified = true;
    copy.local_only = false;
    copy.thumbnail_data = None;

    let original_title = local.title.clone().unwrap_or_default();
    copy.title = Some(ConflictNamer::generate(&original_title));

    copy.attributes_mut().conflict_source_note_guid = local.guid.clone();

    for resource in &mut copy.resources {
        resource.local_id = LocalId::new();
        resource.guid = None;
        resource.update_sequence_num = None;
        resource.note_guid = None;
        resource.note_local_id = Some(copy.local_id);
        resource.locally_modified = true;
    }

    // The copy must not land in a notebook the server is deleting
    let local_notebook_expunged = local
        .notebook_guid
        .as_ref()
        .map(|guid| expunged_notebook_guids.contains(guid))
        .unwrap_or(false);
    if local_notebook_expunged {
        copy.notebook_guid = remote.notebook_guid.clone();
        copy.notebook_local_id = None;
    }

    copy
}
