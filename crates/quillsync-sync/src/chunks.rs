//! Sync-chunk download loop
//!
//! Drives chunked downloads for one scope: request a chunk after the
//! current USN, advance the rolling watermarks, emit progress, and repeat
//! until the chunk's high USN reaches the scope's update count (or the
//! server sends an empty trailing chunk).

use std::sync::Arc;

use quillsync_core::domain::{
    ErrorString, LinkedNotebook, Scope, SyncChunk, SyncChunkFilter, Timestamp, Usn,
};
use quillsync_core::ports::INoteStore;
use tracing::{debug, info};

use crate::backoff::RemoteCaller;
use crate::error::SyncError;
use crate::events::{EventEmitter, SyncEvent};
use crate::session::SyncMode;

/// How many entries to request per sync chunk
pub const MAX_ENTRIES_PER_CHUNK: i32 = 50;

/// Everything one scope's download loop produced.
#[derive(Debug, Clone, Default)]
pub struct DownloadedChunks {
    pub chunks: Vec<SyncChunk>,
    /// Rolling `max` over the chunks' update counts, seeded with the
    /// prior checkpoint
    pub last_update_count: Usn,
    /// Rolling `max` over the chunks' current times, seeded with the
    /// prior checkpoint
    pub last_sync_time: Timestamp,
}

/// Downloads all pending sync chunks for one scope.
///
/// `after_usn` is where the download resumes; `last_update_count` and
/// `last_sync_time` seed the rolling watermarks with the prior
/// checkpoint so they only ever move forward.
#[allow(clippy::too_many_arguments)]
pub async fn download_chunks(
    caller: &RemoteCaller,
    note_store: Arc<dyn INoteStore>,
    scope: &Scope,
    linked_notebook: Option<&LinkedNotebook>,
    mode: SyncMode,
    mut after_usn: Usn,
    last_update_count: Usn,
    last_sync_time: Timestamp,
    emitter: &EventEmitter,
) -> Result<DownloadedChunks, SyncError> {
    let mut result = DownloadedChunks {
        chunks: Vec::new(),
        last_update_count,
        last_sync_time,
    };
    let last_previous_usn = after_usn;

    info!(%scope, after_usn, ?mode, "Starting sync chunk download");

    loop {
        let chunk = request_chunk(caller, &note_store, scope, linked_notebook, mode, after_usn)
            .await?;

        if chunk.update_count < 0 {
            return Err(SyncError::DataShape(ErrorString::new(
                "sync chunk carries a negative update count",
            )));
        }

        // Watermarks only ever advance
        result.last_sync_time = result.last_sync_time.max(chunk.current_time);
        result.last_update_count = result.last_update_count.max(chunk.update_count);

        let high_usn = match chunk.chunk_high_usn {
            Some(high) => high,
            None => {
                // Empty trailing chunk: watermarks advanced, nothing to
                // process
                debug!(%scope, "Received trailing chunk without a high USN");
                emit_progress(
                    emitter,
                    scope,
                    chunk.update_count,
                    chunk.update_count,
                    last_previous_usn,
                );
                if !chunk.is_empty() {
                    result.chunks.push(chunk);
                }
                break;
            }
        };

        if high_usn <= after_usn {
            // A chunk that does not advance the USN would loop forever
            return Err(SyncError::DataShape(
                ErrorString::new("sync chunk does not advance the update sequence number")
                    .with_details(format!("after USN {after_usn}, chunk high USN {high_usn}")),
            ));
        }

        debug!(
            %scope,
            high_usn,
            update_count = chunk.update_count,
            notes = chunk.notes.len(),
            notebooks = chunk.notebooks.len(),
            tags = chunk.tags.len(),
            "Received sync chunk"
        );

        emit_progress(
            emitter,
            scope,
            high_usn,
            chunk.update_count,
            last_previous_usn,
        );

        after_usn = high_usn;
        let last = chunk.is_last();
        result.chunks.push(chunk);

        if last {
            break;
        }
    }

    info!(
        %scope,
        chunks = result.chunks.len(),
        last_update_count = result.last_update_count,
        "Sync chunk download complete"
    );

    Ok(result)
}

async fn request_chunk(
    caller: &RemoteCaller,
    note_store: &Arc<dyn INoteStore>,
    scope: &Scope,
    linked_notebook: Option<&LinkedNotebook>,
    mode: SyncMode,
    after_usn: Usn,
) -> Result<SyncChunk, SyncError> {
    match scope {
        Scope::UserOwn => {
            let filter = match mode {
                SyncMode::Full => SyncChunkFilter::full_sync(),
                SyncMode::Incremental => SyncChunkFilter::incremental_sync(),
            };
            caller
                .call(scope, "getSyncChunk", |token| {
                    let store = note_store.clone();
                    async move {
                        store
                            .get_sync_chunk(after_usn, MAX_ENTRIES_PER_CHUNK, &filter, &token)
                            .await
                    }
                })
                .await
        }
        Scope::LinkedNotebook(_) => {
            let ln = linked_notebook
                .ok_or_else(|| {
                    SyncError::data_shape("linked notebook scope without a linked notebook")
                })?
                .clone();
            let full_sync_only = matches!(mode, SyncMode::Full);
            caller
                .call(scope, "getLinkedNotebookSyncChunk", |token| {
                    let store = note_store.clone();
                    let ln = ln.clone();
                    async move {
                        store
                            .get_linked_notebook_sync_chunk(
                                &ln,
                                after_usn,
                                MAX_ENTRIES_PER_CHUNK,
                                full_sync_only,
                                &token,
                            )
                            .await
                    }
                })
                .await
        }
    }
}

fn emit_progress(
    emitter: &EventEmitter,
    scope: &Scope,
    high_usn: Usn,
    update_count: Usn,
    last_previous_usn: Usn,
) {
    match scope {
        Scope::UserOwn => emitter.emit(SyncEvent::SyncChunksDownloadProgress {
            high_usn,
            update_count,
            last_previous_usn,
        }),
        Scope::LinkedNotebook(guid) => {
            emitter.emit(SyncEvent::LinkedNotebookSyncChunksDownloadProgress {
                linked_notebook_guid: guid.clone(),
                high_usn,
                update_count,
                last_previous_usn,
            })
        }
    }
}
