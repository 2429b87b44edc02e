//! Expunging remote deletions
//!
//! Two mechanisms remove local data in response to server-side deletion:
//!
//! 1. **Chunk expunge lists** (incremental sync): every guid in the
//!    chunks' `expunged_*` lists is removed from the local store.
//! 2. **Stale-item sweep** (repeat full sync): a full sync carries no
//!    expunge lists, so after a scope's *second or later* full sync, local
//!    items whose remote guid was not observed in the session are the
//!    server's silent deletions. Clean items are expunged; locally
//!    modified items survive as brand-new local items (guid and USN
//!    cleared) so the caller's next upload can push them back.

use std::sync::Arc;

use quillsync_core::domain::{Guid, Scope};
use quillsync_core::ports::ILocalStore;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::events::ProcessingCounters;
use crate::pipeline::{ChunkContents, ObservedGuids};

/// Applies every expunged-guid list the chunks of one scope carried.
///
/// Unknown guids are not an error: the client may never have seen the
/// item that was deleted remotely.
pub async fn apply_chunk_expunges(
    local_store: &Arc<dyn ILocalStore>,
    contents: &ChunkContents,
    scope: &Scope,
    counters: &mut ProcessingCounters,
) -> Result<(), SyncError> {
    for guid in &contents.expunged_notes {
        local_store.expunge_note(guid).await?;
        counters.notes_expunged += 1;
    }
    for guid in &contents.expunged_notebooks {
        local_store.expunge_notebook(guid).await?;
        counters.notebooks_expunged += 1;
    }
    for guid in &contents.expunged_tags {
        local_store.expunge_tag(guid).await?;
        counters.tags_expunged += 1;
    }
    for guid in &contents.expunged_searches {
        local_store.expunge_saved_search(guid).await?;
        counters.saved_searches_expunged += 1;
    }
    for guid in &contents.expunged_linked_notebooks {
        local_store.expunge_linked_notebook(guid).await?;
        counters.linked_notebooks_expunged += 1;
    }

    debug!(
        %scope,
        notes = counters.notes_expunged,
        notebooks = counters.notebooks_expunged,
        tags = counters.tags_expunged,
        "Applied chunk expunge lists"
    );
    Ok(())
}

/// Removes local items of `scope` whose guids the just-completed full
/// sync did not report.
///
/// Only meaningful after a *repeat* full sync: the first full sync of a
/// scope has nothing stale to find, and an incremental sync learns of
/// deletions through expunge lists instead.
pub async fn expunge_stale_items(
    local_store: &Arc<dyn ILocalStore>,
    scope: &Scope,
    observed: &ObservedGuids,
) -> Result<(), SyncError> {
    info!(%scope, "Sweeping items absent from the full sync");

    // Saved searches only exist in the user's own scope
    if scope.is_user_own() {
        for search in local_store.list_saved_searches().await? {
            let Some(guid) = search.guid.clone() else { continue };
            if observed.searches.contains(&guid) {
                continue;
            }
            if search.locally_modified {
                let mut kept = search;
                kept.guid = None;
                kept.update_sequence_num = None;
                local_store.update_saved_search(&kept).await?;
                warn!(%guid, "Stale saved search is locally modified, keeping it as a new local item");
            } else {
                local_store.expunge_saved_search(&guid).await?;
                debug!(%guid, "Expunged stale saved search");
            }
        }
    }

    for note in local_store.list_note_summaries(scope).await? {
        let Some(guid) = note.guid.clone() else { continue };
        if observed.notes.contains(&guid) {
            continue;
        }
        if note.locally_modified {
            detach_note_from_server(local_store, &guid).await?;
            warn!(%guid, "Stale note is locally modified, keeping it as a new local item");
        } else {
            local_store.expunge_note(&guid).await?;
            debug!(%guid, "Expunged stale note");
        }
    }

    for tag in local_store.list_tags(scope).await? {
        let Some(guid) = tag.guid.clone() else { continue };
        if observed.tags.contains(&guid) {
            continue;
        }
        if tag.locally_modified {
            let mut kept = tag;
            kept.guid = None;
            kept.update_sequence_num = None;
            kept.parent_guid = None;
            local_store.update_tag(&kept).await?;
            warn!(%guid, "Stale tag is locally modified, keeping it as a new local item");
        } else {
            local_store.expunge_tag(&guid).await?;
            debug!(%guid, "Expunged stale tag");
        }
    }

    for notebook in local_store.list_notebooks(scope).await? {
        let Some(guid) = notebook.guid.clone() else { continue };
        if observed.notebooks.contains(&guid) {
            continue;
        }
        if notebook.locally_modified {
            let mut kept = notebook;
            kept.guid = None;
            kept.update_sequence_num = None;
            local_store.update_notebook(&kept).await?;
            warn!(%guid, "Stale notebook is locally modified, keeping it as a new local item");
        } else {
            local_store.expunge_notebook(&guid).await?;
            debug!(%guid, "Expunged stale notebook");
        }
    }

    Ok(())
}

/// Turns a note the server no longer knows into a purely local note:
/// guid and USN cleared, resources stripped of their server identity.
async fn detach_note_from_server(
    local_store: &Arc<dyn ILocalStore>,
    guid: &Guid,
) -> Result<(), SyncError> {
    let Some(mut note) = local_store.find_note_by_guid(guid).await? else {
        return Ok(());
    };
    note.guid = None;
    note.update_sequence_num = None;
    for resource in &mut note.resources {
        resource.guid = None;
        resource.update_sequence_num = None;
        resource.note_guid = None;
    }
    // The note row still carries the old guid; replacing it goes through
    // an expunge-then-add so no orphan row survives.
    local_store.expunge_note(guid).await?;
    local_store.add_note(&note).await?;
    Ok(())
}
