//! Notebook entity

use serde::{Deserialize, Serialize};

use super::newtypes::{Guid, LocalId, Timestamp, Usn};

/// Restrictions the service places on a notebook the user does not own.
///
/// Only the restrictions the sync engine consults are carried; the
/// service defines many more.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookRestrictions {
    pub no_create_notes: bool,
    pub no_update_notes: bool,
    pub no_expunge_notes: bool,
    pub no_expunge_notebook: bool,
}

/// A notebook: the container every note belongs to.
///
/// `guid` is server-assigned and absent until the notebook has been seen
/// by the service; `local_id` is always present. `linked_notebook_guid`
/// binds the notebook to a shared scope when it arrived through a linked
/// notebook's sync chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub guid: Option<Guid>,
    pub local_id: LocalId,
    pub name: Option<String>,
    pub update_sequence_num: Option<Usn>,
    pub default_notebook: bool,
    pub service_created: Option<Timestamp>,
    pub service_updated: Option<Timestamp>,
    pub linked_notebook_guid: Option<Guid>,
    pub restrictions: Option<NotebookRestrictions>,
    /// True while a local-only change is outstanding
    pub locally_modified: bool,
    /// True for notebooks that must never be pushed to the service
    pub local_only: bool,
}

impl Notebook {
    /// Creates an empty notebook with a fresh local id
    pub fn new() -> Self {
        Self {
            guid: None,
            local_id: LocalId::new(),
            name: None,
            update_sequence_num: None,
            default_notebook: false,
            service_created: None,
            service_updated: None,
            linked_notebook_guid: None,
            restrictions: None,
            locally_modified: false,
            local_only: false,
        }
    }
}

impl Default for Notebook {
    fn default() -> Self {
        Self::new()
    }
}
