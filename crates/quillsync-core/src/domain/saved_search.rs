//! Saved search entity

use serde::{Deserialize, Serialize};

use super::newtypes::{Guid, LocalId, Usn};

/// A saved search. Saved searches exist only in the user's own scope;
/// linked notebooks never carry them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub guid: Option<Guid>,
    pub local_id: LocalId,
    pub name: Option<String>,
    /// The search grammar string
    pub query: Option<String>,
    pub update_sequence_num: Option<Usn>,
    pub locally_modified: bool,
    pub local_only: bool,
}

impl SavedSearch {
    pub fn new() -> Self {
        Self {
            guid: None,
            local_id: LocalId::new(),
            name: None,
            query: None,
            update_sequence_num: None,
            locally_modified: false,
            local_only: false,
        }
    }
}

impl Default for SavedSearch {
    fn default() -> Self {
        Self::new()
    }
}
