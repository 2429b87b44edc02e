//! Repeat full sync: items the server silently dropped are swept out

use std::sync::Arc;

use quillsync_core::domain::{SyncChunk, SyncState};
use quillsync_sync::LastSyncParameters;

use crate::support::{self, MemoryLocalStore, MockRemote};

#[tokio::test]
async fn test_repeat_full_sync_expunges_clean_stale_items() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(MemoryLocalStore::new());

    // Local state from a prior full sync
    store
        .notebooks
        .lock()
        .unwrap()
        .push(support::remote_notebook("nb-keep", "Keep", 10));
    store
        .notebooks
        .lock()
        .unwrap()
        .push(support::remote_notebook("nb-stale", "Stale", 11));
    store
        .notes
        .lock()
        .unwrap()
        .push(support::full_note("n-keep", "Kept note", 20, "nb-keep"));
    store
        .notes
        .lock()
        .unwrap()
        .push(support::full_note("n-stale", "Stale note", 21, "nb-keep"));

    // The server demands a full resync and then only reports the survivors
    *remote.sync_state.lock().unwrap() = Some(SyncState {
        current_time: 9_000,
        full_sync_before: 8_000,
        update_count: 300,
    });
    remote.push_chunk(SyncChunk {
        current_time: 9_000,
        chunk_high_usn: Some(300),
        update_count: 300,
        notebooks: vec![support::remote_notebook("nb-keep", "Keep", 250)],
        notes: vec![support::chunk_note("n-keep", "Kept note", 260, "nb-keep")],
        ..Default::default()
    });
    remote.serve_full_note(support::full_note("n-keep", "Kept note", 260, "nb-keep"));

    let (mut engine, _rx, _limits_dir) = support::build_engine(remote, store.clone());
    engine.set_last_sync_parameters(LastSyncParameters {
        last_update_count: 100,
        last_sync_time: 5_000, // non-zero: this scope fully synced before
        ..Default::default()
    });
    engine.start(100).await.expect("sync failed");

    // The survivors are still there
    assert!(store.notebook_by_guid(&support::guid("nb-keep")).is_some());
    assert!(store.note_by_guid(&support::guid("n-keep")).is_some());

    // The stale clean items are gone
    assert!(store.notebook_by_guid(&support::guid("nb-stale")).is_none());
    assert!(store.note_by_guid(&support::guid("n-stale")).is_none());
}

#[tokio::test]
async fn test_repeat_full_sync_preserves_dirty_stale_note_as_local() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(MemoryLocalStore::new());

    store
        .notebooks
        .lock()
        .unwrap()
        .push(support::remote_notebook("nb-keep", "Keep", 10));
    let mut dirty = support::full_note("n-dirty", "Unsaved work", 21, "nb-keep");
    dirty.locally_modified = true;
    store.notes.lock().unwrap().push(dirty);

    *remote.sync_state.lock().unwrap() = Some(SyncState {
        current_time: 9_000,
        full_sync_before: 8_000,
        update_count: 300,
    });
    remote.push_chunk(SyncChunk {
        current_time: 9_000,
        chunk_high_usn: Some(300),
        update_count: 300,
        notebooks: vec![support::remote_notebook("nb-keep", "Keep", 250)],
        ..Default::default()
    });

    let (mut engine, _rx, _limits_dir) = support::build_engine(remote, store.clone());
    engine.set_last_sync_parameters(LastSyncParameters {
        last_update_count: 100,
        last_sync_time: 5_000,
        ..Default::default()
    });
    engine.start(100).await.expect("sync failed");

    // The note survives as a purely local item: no guid, no USN, still
    // carrying the unsaved work
    assert!(store.note_by_guid(&support::guid("n-dirty")).is_none());
    let kept = store.note_by_title("Unsaved work").expect("note must survive");
    assert!(kept.guid.is_none());
    assert!(kept.update_sequence_num.is_none());
    assert!(kept.locally_modified);
}

#[tokio::test]
async fn test_first_full_sync_does_not_sweep() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(MemoryLocalStore::new());

    // Pre-seeded local data (e.g. imported) and a first-ever full sync
    store
        .notebooks
        .lock()
        .unwrap()
        .push(support::remote_notebook("nb-local", "Imported", 1));

    remote.push_chunk(SyncChunk {
        current_time: 1_000,
        chunk_high_usn: Some(10),
        update_count: 10,
        notebooks: vec![support::remote_notebook("nb-remote", "Remote", 10)],
        ..Default::default()
    });

    let (mut engine, _rx, _limits_dir) = support::build_engine(remote, store.clone());
    // cold_start: last_sync_time == 0, so this is the first full sync
    engine.start(0).await.expect("sync failed");

    // Nothing was swept
    assert!(store.notebook_by_guid(&support::guid("nb-local")).is_some());
    assert!(store.notebook_by_guid(&support::guid("nb-remote")).is_some());
}
