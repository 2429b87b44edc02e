//! Note entity

use serde::{Deserialize, Serialize};

use super::newtypes::{Guid, LocalId, Timestamp, Usn};
use super::resource::Resource;

/// Service-defined note attributes the engine consults.
///
/// Only a small slice of the service's attribute set matters to
/// synchronization; the rest travels opaquely through the local store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteAttributes {
    /// Guid of the note this one was forked from during conflict
    /// resolution
    pub conflict_source_note_guid: Option<Guid>,
    pub source: Option<String>,
    pub source_url: Option<String>,
    pub author: Option<String>,
}

impl NoteAttributes {
    /// Returns true if no attribute is set
    pub fn is_empty(&self) -> bool {
        self.conflict_source_note_guid.is_none()
            && self.source.is_none()
            && self.source_url.is_none()
            && self.author.is_none()
    }
}

/// A note. Belongs to exactly one notebook, referenced either by guid
/// (known-remote notebooks) or by local id (never-synced notebooks); at
/// least one reference must be present for notes fed into the sync
/// pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub guid: Option<Guid>,
    pub local_id: LocalId,
    pub title: Option<String>,
    /// Note markup body; absent until the full content has been fetched
    pub content: Option<String>,
    pub content_length: Option<i32>,
    pub created: Option<Timestamp>,
    pub updated: Option<Timestamp>,
    /// Set when the note has been moved to the trash
    pub deleted: Option<Timestamp>,
    pub active: bool,
    pub update_sequence_num: Option<Usn>,
    pub notebook_guid: Option<Guid>,
    pub notebook_local_id: Option<LocalId>,
    pub tag_guids: Vec<Guid>,
    pub tag_local_ids: Vec<LocalId>,
    pub resources: Vec<Resource>,
    pub attributes: Option<NoteAttributes>,
    /// Thumbnail bytes fetched by the auxiliary downloader
    pub thumbnail_data: Option<Vec<u8>>,
    pub locally_modified: bool,
    pub local_only: bool,
}

impl Note {
    pub fn new() -> Self {
        Self {
            guid: None,
            local_id: LocalId::new(),
            title: None,
            content: None,
            content_length: None,
            created: None,
            updated: None,
            deleted: None,
            active: true,
            update_sequence_num: None,
            notebook_guid: None,
            notebook_local_id: None,
            tag_guids: Vec::new(),
            tag_local_ids: Vec::new(),
            resources: Vec::new(),
            attributes: None,
            thumbnail_data: None,
            locally_modified: false,
            local_only: false,
        }
    }

    /// Returns true if the note carries a notebook reference of either form
    pub fn has_notebook_reference(&self) -> bool {
        self.notebook_guid.is_some() || self.notebook_local_id.is_some()
    }

    /// Returns true if any resource is an ink drawing
    pub fn is_ink_note(&self) -> bool {
        self.resources.iter().any(Resource::is_ink)
    }

    /// Returns the attributes, creating them if absent
    pub fn attributes_mut(&mut self) -> &mut NoteAttributes {
        self.attributes.get_or_insert_with(NoteAttributes::default)
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::new()
    }
}

/// Lightweight per-note record for listings that must not haul note
/// bodies out of the local store (the stale-item sweep after a repeat
/// full sync works on these).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub guid: Option<Guid>,
    pub local_id: LocalId,
    pub title: Option<String>,
    pub update_sequence_num: Option<Usn>,
    pub notebook_guid: Option<Guid>,
    pub locally_modified: bool,
}
