//! Session-level types: sync mode, checkpoint parameters, final summary

use std::collections::HashMap;

use quillsync_core::domain::{Guid, Timestamp, Usn};
use serde::{Deserialize, Serialize};

/// Whether a scope is being synchronized from scratch or resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Sync from USN 0; the server sends everything and no expunge lists
    Full,
    /// Resume from a prior USN; the server sends deltas plus expunge
    /// lists
    Incremental,
}

impl SyncMode {
    /// Mode implied by the USN a scope resumes from
    pub fn from_after_usn(after_usn: Usn) -> Self {
        if after_usn == 0 {
            SyncMode::Full
        } else {
            SyncMode::Incremental
        }
    }
}

/// Checkpoint values of one linked-notebook scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedNotebookSyncParams {
    pub last_update_count: Usn,
    pub last_sync_time: Timestamp,
}

/// The sync checkpoints of the previous session, supplied by the caller
/// before `start`.
///
/// The engine treats these as opaque resumption values: `last_update_count`
/// selects incremental vs full sync and `last_sync_time` feeds the
/// server's `full_sync_before` comparison. A linked notebook with a
/// non-zero `last_sync_time` is known to have completed a full sync
/// before, which is what the repeat-full-sync stale-item sweep keys on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastSyncParameters {
    pub last_update_count: Usn,
    pub last_sync_time: Timestamp,
    pub linked_notebooks: HashMap<Guid, LinkedNotebookSyncParams>,
}

impl LastSyncParameters {
    /// Parameters of a client that has never synchronized
    pub fn cold_start() -> Self {
        Self::default()
    }

    /// Checkpoint for one linked notebook, defaulting to a cold start
    pub fn linked_notebook(&self, guid: &Guid) -> LinkedNotebookSyncParams {
        self.linked_notebooks.get(guid).copied().unwrap_or_default()
    }
}

/// The values a completed session hands back for persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub last_update_count: Usn,
    pub last_sync_time: Timestamp,
    pub linked_notebooks: HashMap<Guid, LinkedNotebookSyncParams>,
}
