//! Resource entity (file attachment of a note)

use serde::{Deserialize, Serialize};

use super::newtypes::{Guid, LocalId, Usn};

/// MIME type the service uses for ink-note drawings
pub const INK_NOTE_MIME: &str = "application/vnd.evernote.ink";

/// One data block of a resource: the body itself, its recognition index,
/// or its alternate rendition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceData {
    /// Raw bytes; absent when only metadata was synchronized
    pub body: Option<Vec<u8>>,
    /// Size in bytes as reported by the service
    pub size: Option<i32>,
    /// MD5 of the body as reported by the service
    pub body_hash: Option<Vec<u8>>,
}

impl ResourceData {
    /// Returns true if neither body nor metadata is present
    pub fn is_empty(&self) -> bool {
        self.body.is_none() && self.size.is_none() && self.body_hash.is_none()
    }
}

/// A binary attachment belonging to exactly one note.
///
/// `note_guid`/`note_local_id` point at the owning note; a resource of a
/// note that has a guid always carries a guid itself, while resources of
/// conflicting-note copies carry none (they are local re-parents).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub guid: Option<Guid>,
    pub local_id: LocalId,
    pub note_guid: Option<Guid>,
    pub note_local_id: Option<LocalId>,
    pub mime: Option<String>,
    pub width: Option<i16>,
    pub height: Option<i16>,
    pub update_sequence_num: Option<Usn>,
    pub data: Option<ResourceData>,
    pub recognition: Option<ResourceData>,
    pub alternate_data: Option<ResourceData>,
    pub locally_modified: bool,
}

impl Resource {
    pub fn new() -> Self {
        Self {
            guid: None,
            local_id: LocalId::new(),
            note_guid: None,
            note_local_id: None,
            mime: None,
            width: None,
            height: None,
            update_sequence_num: None,
            data: None,
            recognition: None,
            alternate_data: None,
            locally_modified: false,
        }
    }

    /// Returns true if this resource is an ink-note drawing
    pub fn is_ink(&self) -> bool {
        self.mime.as_deref() == Some(INK_NOTE_MIME)
    }
}

impl Default for Resource {
    fn default() -> Self {
        Self::new()
    }
}
