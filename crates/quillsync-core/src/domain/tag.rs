//! Tag entity

use serde::{Deserialize, Serialize};

use super::newtypes::{Guid, LocalId, Usn};

/// A tag. Tags form a forest through `parent_guid`; a tag is only written
/// to the local store after its parent (within the same scope) exists
/// there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub guid: Option<Guid>,
    pub local_id: LocalId,
    pub name: Option<String>,
    pub parent_guid: Option<Guid>,
    /// Local id of the parent tag when known locally
    pub parent_local_id: Option<LocalId>,
    pub update_sequence_num: Option<Usn>,
    pub linked_notebook_guid: Option<Guid>,
    pub locally_modified: bool,
    pub local_only: bool,
}

impl Tag {
    pub fn new() -> Self {
        Self {
            guid: None,
            local_id: LocalId::new(),
            name: None,
            parent_guid: None,
            parent_local_id: None,
            update_sequence_num: None,
            linked_notebook_guid: None,
            locally_modified: false,
            local_only: false,
        }
    }
}

impl Default for Tag {
    fn default() -> Self {
        Self::new()
    }
}
