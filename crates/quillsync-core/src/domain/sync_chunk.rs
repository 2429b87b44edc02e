//! Sync chunk and sync state records
//!
//! A sync chunk is the service's unit of incremental download: a batch of
//! added/updated entities plus (in incremental mode) lists of expunged
//! guids, bounded by USN. The sync state summarizes a scope so the client
//! can decide whether anything needs downloading at all.

use serde::{Deserialize, Serialize};

use super::linked_notebook::LinkedNotebook;
use super::newtypes::{Guid, Timestamp, Usn};
use super::note::Note;
use super::notebook::Notebook;
use super::resource::Resource;
use super::saved_search::SavedSearch;
use super::tag::Tag;

/// Per-scope summary the service reports via `get_sync_state`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Service clock at the time of the call
    pub current_time: Timestamp,
    /// Clients whose last full sync predates this timestamp must perform
    /// a new full sync
    pub full_sync_before: Timestamp,
    /// Total number of mutations ever applied to the scope
    pub update_count: Usn,
}

/// One server-emitted batch of changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncChunk {
    /// Service clock at the time the chunk was produced
    pub current_time: Timestamp,
    /// Highest USN contained in this chunk; absent for an empty trailing
    /// chunk
    pub chunk_high_usn: Option<Usn>,
    /// The scope's total update count at the time of the call
    pub update_count: Usn,

    pub notebooks: Vec<Notebook>,
    pub tags: Vec<Tag>,
    pub searches: Vec<SavedSearch>,
    pub notes: Vec<Note>,
    pub resources: Vec<Resource>,
    pub linked_notebooks: Vec<LinkedNotebook>,

    pub expunged_notes: Vec<Guid>,
    pub expunged_notebooks: Vec<Guid>,
    pub expunged_tags: Vec<Guid>,
    pub expunged_searches: Vec<Guid>,
    pub expunged_linked_notebooks: Vec<Guid>,
}

impl SyncChunk {
    /// Returns true if this chunk is the last one of the download loop:
    /// its high USN equals the scope's update count, or it carries no
    /// content at all.
    pub fn is_last(&self) -> bool {
        match self.chunk_high_usn {
            Some(high) => high >= self.update_count,
            None => true,
        }
    }

    /// Returns true if the chunk carries neither entities nor expunges
    pub fn is_empty(&self) -> bool {
        self.notebooks.is_empty()
            && self.tags.is_empty()
            && self.searches.is_empty()
            && self.notes.is_empty()
            && self.resources.is_empty()
            && self.linked_notebooks.is_empty()
            && self.expunged_notes.is_empty()
            && self.expunged_notebooks.is_empty()
            && self.expunged_tags.is_empty()
            && self.expunged_searches.is_empty()
            && self.expunged_linked_notebooks.is_empty()
    }
}

/// Which entity kinds a sync-chunk download should include.
///
/// Full syncs embed resources inside their notes and carry no expunge
/// lists; incremental syncs request expunged guids and standalone
/// resource entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncChunkFilter {
    pub include_notes: bool,
    pub include_notebooks: bool,
    pub include_tags: bool,
    pub include_searches: bool,
    pub include_linked_notebooks: bool,
    pub include_resources: bool,
    pub include_expunged: bool,
    pub include_note_resources: bool,
    pub include_note_attributes: bool,
}

impl SyncChunkFilter {
    /// Filter for a full sync: everything embedded, no expunges, no
    /// standalone resources.
    pub fn full_sync() -> Self {
        Self {
            include_notes: true,
            include_notebooks: true,
            include_tags: true,
            include_searches: true,
            include_linked_notebooks: true,
            include_resources: false,
            include_expunged: false,
            include_note_resources: true,
            include_note_attributes: true,
        }
    }

    /// Filter for an incremental sync: expunge lists and standalone
    /// resource entries included.
    pub fn incremental_sync() -> Self {
        Self {
            include_resources: true,
            include_expunged: true,
            ..Self::full_sync()
        }
    }

}
