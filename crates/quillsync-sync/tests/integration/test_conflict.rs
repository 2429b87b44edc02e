//! Conflict scenarios: dirty local notes fork, current locals survive

use std::sync::Arc;

use quillsync_core::domain::SyncChunk;
use quillsync_sync::LastSyncParameters;

use crate::support::{self, MemoryLocalStore, MockRemote};

fn incremental_params() -> LastSyncParameters {
    LastSyncParameters {
        last_update_count: 10,
        last_sync_time: 1_000,
        ..Default::default()
    }
}

fn script_state(remote: &MockRemote, update_count: i32) {
    *remote.sync_state.lock().unwrap() = Some(quillsync_core::domain::SyncState {
        current_time: 2_000,
        full_sync_before: 0,
        update_count,
    });
}

#[tokio::test]
async fn test_dirty_local_note_forks_into_conflicting_copy() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(MemoryLocalStore::new());

    store
        .notebooks
        .lock()
        .unwrap()
        .push(support::remote_notebook("nb-1", "Projects", 5));

    // The local draft diverged while the server moved on
    let mut local = support::full_note("n-1", "Draft", 10, "nb-1");
    local.locally_modified = true;
    let original_local_id = local.local_id;
    store.notes.lock().unwrap().push(local);

    script_state(&remote, 20);
    remote.push_chunk(SyncChunk {
        current_time: 2_000,
        chunk_high_usn: Some(20),
        update_count: 20,
        notes: vec![support::chunk_note("n-1", "Final", 20, "nb-1")],
        ..Default::default()
    });
    remote.serve_full_note(support::full_note("n-1", "Final", 20, "nb-1"));

    let (mut engine, _rx, _limits_dir) = support::build_engine(remote, store.clone());
    engine.set_last_sync_parameters(incremental_params());
    engine.start(10).await.expect("sync failed");

    // The original local id now holds the remote version, clean
    let remote_version = store.note_by_guid(&support::guid("n-1")).unwrap();
    assert_eq!(remote_version.local_id, original_local_id);
    assert_eq!(remote_version.title.as_deref(), Some("Final"));
    assert_eq!(remote_version.update_sequence_num, Some(20));
    assert!(!remote_version.locally_modified);

    // A conflicting copy preserves the local work
    let copy = store.note_by_title("Draft - conflicting").unwrap();
    assert_ne!(copy.local_id, original_local_id);
    assert!(copy.guid.is_none());
    assert!(copy.update_sequence_num.is_none());
    assert!(copy.locally_modified);
    assert_eq!(
        copy.attributes.as_ref().unwrap().conflict_source_note_guid,
        Some(support::guid("n-1"))
    );
}

#[tokio::test]
async fn test_current_local_note_is_not_touched() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(MemoryLocalStore::new());

    store
        .notebooks
        .lock()
        .unwrap()
        .push(support::remote_notebook("nb-1", "Projects", 5));

    // Local copy already carries the USN the chunk announces
    let local = support::full_note("n-1", "Settled", 20, "nb-1");
    store.notes.lock().unwrap().push(local.clone());

    script_state(&remote, 20);
    remote.push_chunk(SyncChunk {
        current_time: 2_000,
        chunk_high_usn: Some(20),
        update_count: 20,
        notes: vec![support::chunk_note("n-1", "Settled elsewhere", 20, "nb-1")],
        ..Default::default()
    });

    let (mut engine, _rx, _limits_dir) = support::build_engine(remote.clone(), store.clone());
    engine.set_last_sync_parameters(incremental_params());
    engine.start(10).await.expect("sync failed");

    // No full-note fetch happened and the local copy is unchanged
    assert!(remote.full_notes.lock().unwrap().is_empty());
    let unchanged = store.note_by_guid(&support::guid("n-1")).unwrap();
    assert_eq!(unchanged.title.as_deref(), Some("Settled"));
    assert_eq!(unchanged.local_id, local.local_id);
}

#[tokio::test]
async fn test_clean_stale_local_note_is_overwritten() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(MemoryLocalStore::new());

    store
        .notebooks
        .lock()
        .unwrap()
        .push(support::remote_notebook("nb-1", "Projects", 5));

    let local = support::full_note("n-1", "Old title", 10, "nb-1");
    let local_id = local.local_id;
    store.notes.lock().unwrap().push(local);

    script_state(&remote, 20);
    remote.push_chunk(SyncChunk {
        current_time: 2_000,
        chunk_high_usn: Some(20),
        update_count: 20,
        notes: vec![support::chunk_note("n-1", "New title", 20, "nb-1")],
        ..Default::default()
    });
    remote.serve_full_note(support::full_note("n-1", "New title", 20, "nb-1"));

    let (mut engine, _rx, _limits_dir) = support::build_engine(remote, store.clone());
    engine.set_last_sync_parameters(incremental_params());
    engine.start(10).await.expect("sync failed");

    let updated = store.note_by_guid(&support::guid("n-1")).unwrap();
    assert_eq!(updated.local_id, local_id);
    assert_eq!(updated.title.as_deref(), Some("New title"));
    assert!(store.note_by_title("Old title - conflicting").is_none());

    // Exactly one note exists
    assert_eq!(store.notes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_dirty_notebook_name_collision_renames_local() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(MemoryLocalStore::new());

    // A never-synced, locally modified notebook occupies the name the
    // server now sends for a different notebook
    let mut local = support::remote_notebook("unused", "Projects", 1);
    local.guid = None;
    local.update_sequence_num = None;
    local.locally_modified = true;
    store.notebooks.lock().unwrap().push(local);

    script_state(&remote, 20);
    remote.push_chunk(SyncChunk {
        current_time: 2_000,
        chunk_high_usn: Some(20),
        update_count: 20,
        notebooks: vec![support::remote_notebook("nb-remote", "Projects", 20)],
        ..Default::default()
    });

    let (mut engine, _rx, _limits_dir) = support::build_engine(remote, store.clone());
    engine.set_last_sync_parameters(incremental_params());
    engine.start(10).await.expect("sync failed");

    let notebooks = store.notebooks.lock().unwrap();
    assert_eq!(notebooks.len(), 2);

    let renamed = notebooks
        .iter()
        .find(|nb| nb.name.as_deref() == Some("Projects - conflicting"))
        .expect("local notebook should be renamed aside");
    assert!(renamed.guid.is_none());
    assert!(renamed.locally_modified);

    let incoming = notebooks
        .iter()
        .find(|nb| nb.guid == Some(support::guid("nb-remote")))
        .unwrap();
    assert_eq!(incoming.name.as_deref(), Some("Projects"));
    assert!(!incoming.locally_modified);
}
