//! Events the engine emits to its caller
//!
//! The engine reports progress and terminal outcomes over an unbounded
//! channel; callers consume the receiver at their own pace. Sending never
//! blocks the sync pipeline, and a dropped receiver silently discards
//! events rather than failing the session.

use std::collections::HashMap;

use quillsync_core::domain::{ErrorString, Guid, LinkedNotebook, Timestamp, Usn};
use tokio::sync::mpsc;

use crate::session::LinkedNotebookSyncParams;

/// Per-kind counts of processed sync-chunk entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProcessingCounters {
    pub notebooks_added: u32,
    pub notebooks_updated: u32,
    pub notebooks_expunged: u32,
    pub tags_added: u32,
    pub tags_updated: u32,
    pub tags_expunged: u32,
    pub saved_searches_added: u32,
    pub saved_searches_updated: u32,
    pub saved_searches_expunged: u32,
    pub notes_added: u32,
    pub notes_updated: u32,
    pub notes_expunged: u32,
    pub resources_added: u32,
    pub resources_updated: u32,
    pub linked_notebooks_added: u32,
    pub linked_notebooks_updated: u32,
    pub linked_notebooks_expunged: u32,
}

/// Everything the engine tells its caller.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Chunk download progress for the user's own scope
    SyncChunksDownloadProgress {
        high_usn: Usn,
        update_count: Usn,
        last_previous_usn: Usn,
    },
    /// Pipeline progress for the user's own scope
    SyncChunksDataProcessingProgress { counters: ProcessingCounters },
    /// Chunk download progress for one linked notebook
    LinkedNotebookSyncChunksDownloadProgress {
        linked_notebook_guid: Guid,
        high_usn: Usn,
        update_count: Usn,
        last_previous_usn: Usn,
    },
    /// Pipeline progress for one linked notebook
    LinkedNotebookSyncChunksDataProcessingProgress {
        linked_notebook_guid: Guid,
        counters: ProcessingCounters,
    },
    /// Full-note download progress for the user's own scope
    NotesDownloadProgress { done: u32, total: u32 },
    /// Full-note download progress for one linked notebook
    LinkedNotebookNotesDownloadProgress {
        linked_notebook_guid: Guid,
        done: u32,
        total: u32,
    },
    /// Standalone resource download progress for the user's own scope
    ResourcesDownloadProgress { done: u32, total: u32 },
    /// Standalone resource download progress for one linked notebook
    LinkedNotebookResourcesDownloadProgress {
        linked_notebook_guid: Guid,
        done: u32,
        total: u32,
    },
    /// The service throttled us; the engine retries after this many
    /// seconds
    RateLimitExceeded { seconds: i32 },
    /// The user's own auth token expired; a refresh is in flight
    RequestAuthenticationToken,
    /// Linked-notebook tokens expired or are about to; a bulk refresh is
    /// in flight for these notebooks
    RequestAuthenticationTokensForLinkedNotebooks {
        linked_notebooks: Vec<LinkedNotebook>,
    },
    /// The user's own scope finished content ingestion
    SynchronizedContentFromUsersOwnAccount {
        last_update_count: Usn,
        last_sync_time: Timestamp,
    },
    /// All remote expunges of the current scope set have been applied
    ExpungedFromServerToClient,
    /// The session was cancelled
    Stopped,
    /// The session terminated with an error
    Failure { error: ErrorString },
    /// The session completed; these are the new checkpoint values
    Finished {
        last_update_count: Usn,
        last_sync_time: Timestamp,
        linked_notebooks: HashMap<Guid, LinkedNotebookSyncParams>,
    },
}

/// Cloneable sending half of the engine's event channel.
///
/// A closed receiver is not an error: events are best-effort
/// notifications.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl EventEmitter {
    /// Creates an emitter together with its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Sends one event, ignoring a closed receiver
    pub fn emit(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }
}
