//! Linked-notebook fan-out: separate scopes, separate checkpoints

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use quillsync_core::domain::{LinkedNotebook, ShardId, SyncChunk, SyncState};
use quillsync_core::ports::ILocalStore;
use quillsync_sync::{LastSyncParameters, LinkedNotebookSyncParams};

use crate::support::{self, MemoryLocalStore, MockRemote};

fn linked_notebook(guid_str: &str) -> LinkedNotebook {
    LinkedNotebook {
        guid: Some(support::guid(guid_str)),
        share_name: Some("Team notes".to_string()),
        username: Some("teammate".to_string()),
        shard_id: Some(ShardId::new("s9").unwrap()),
        shared_notebook_global_id: Some("global-id".to_string()),
        note_store_url: Some("https://www.example.com/shard/s9/notestore".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_up_to_date_linked_notebook_is_skipped() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(MemoryLocalStore::new());

    store
        .linked_notebooks
        .lock()
        .unwrap()
        .push(linked_notebook("ln-1"));

    // The user's own scope is also up to date
    *remote.sync_state.lock().unwrap() = Some(SyncState {
        current_time: 6_000,
        full_sync_before: 0,
        update_count: 50,
    });
    remote.linked_sync_states.lock().unwrap().insert(
        support::guid("ln-1"),
        SyncState {
            current_time: 6_000,
            full_sync_before: 0,
            update_count: 200,
        },
    );

    let (mut engine, _rx, _limits_dir) = support::build_engine(remote.clone(), store.clone());
    engine.set_last_sync_parameters(LastSyncParameters {
        last_update_count: 50,
        last_sync_time: 5_000,
        linked_notebooks: HashMap::from([(
            support::guid("ln-1"),
            LinkedNotebookSyncParams {
                last_update_count: 200,
                last_sync_time: 5_500,
            },
        )]),
    });

    let summary = engine.start(50).await.expect("sync failed");

    // No chunks were fetched for the linked notebook and its checkpoint
    // is unchanged
    assert!(remote.linked_chunk_requests.lock().unwrap().is_empty());
    assert_eq!(
        summary.linked_notebooks.get(&support::guid("ln-1")),
        Some(&LinkedNotebookSyncParams {
            last_update_count: 200,
            last_sync_time: 5_500,
        })
    );

    // No content writes happened for the linked notebook's scope
    assert!(store
        .list_notebooks(&quillsync_core::domain::Scope::LinkedNotebook(
            support::guid("ln-1")
        ))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_linked_notebook_content_lands_in_its_scope() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(MemoryLocalStore::new());

    store
        .linked_notebooks
        .lock()
        .unwrap()
        .push(linked_notebook("ln-1"));

    // Cold start for both scopes; the user scope has nothing to offer
    remote.push_chunk(SyncChunk {
        current_time: 1_000,
        chunk_high_usn: None,
        update_count: 0,
        ..Default::default()
    });

    let mut shared_nb = support::remote_notebook("nb-shared", "Shared", 10);
    // The wire copy carries no scope binding; the pipeline adds it
    shared_nb.linked_notebook_guid = None;
    remote.linked_chunk_script.lock().unwrap().insert(
        support::guid("ln-1"),
        VecDeque::from([SyncChunk {
            current_time: 7_000,
            chunk_high_usn: Some(30),
            update_count: 30,
            notebooks: vec![shared_nb],
            notes: vec![support::chunk_note("n-shared", "Shared note", 25, "nb-shared")],
            ..Default::default()
        }]),
    );
    remote.serve_full_note(support::full_note("n-shared", "Shared note", 25, "nb-shared"));

    let (mut engine, _rx, _limits_dir) = support::build_engine(remote.clone(), store.clone());
    let summary = engine.start(0).await.expect("sync failed");

    // The notebook landed bound to the linked notebook's scope
    let nb = store.notebook_by_guid(&support::guid("nb-shared")).unwrap();
    assert_eq!(nb.linked_notebook_guid, Some(support::guid("ln-1")));

    let note = store.note_by_guid(&support::guid("n-shared")).unwrap();
    assert_eq!(note.notebook_local_id, Some(nb.local_id));

    // The linked notebook got its own checkpoint
    assert_eq!(
        summary.linked_notebooks.get(&support::guid("ln-1")),
        Some(&LinkedNotebookSyncParams {
            last_update_count: 30,
            last_sync_time: 7_000,
        })
    );

    // And the fetch went through the linked-notebook API from USN 0
    assert_eq!(
        remote.linked_chunk_requests.lock().unwrap().as_slice(),
        &[(support::guid("ln-1"), 0)]
    );
}

#[tokio::test]
async fn test_tag_with_parent_outside_linked_notebook_loses_parent() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(MemoryLocalStore::new());

    store
        .linked_notebooks
        .lock()
        .unwrap()
        .push(linked_notebook("ln-1"));

    remote.push_chunk(SyncChunk {
        current_time: 1_000,
        chunk_high_usn: None,
        update_count: 0,
        ..Default::default()
    });

    // The shared tag's parent lives only in the owner's account
    remote.linked_chunk_script.lock().unwrap().insert(
        support::guid("ln-1"),
        VecDeque::from([SyncChunk {
            current_time: 7_000,
            chunk_high_usn: Some(30),
            update_count: 30,
            tags: vec![support::remote_tag(
                "t-shared",
                "shared-tag",
                30,
                Some("t-owner-only"),
            )],
            ..Default::default()
        }]),
    );

    let (mut engine, _rx, _limits_dir) = support::build_engine(remote, store.clone());
    engine.start(0).await.expect("sync failed");

    let tags = store.tags.lock().unwrap();
    let shared = tags
        .iter()
        .find(|t| t.guid == Some(support::guid("t-shared")))
        .unwrap();
    assert!(shared.parent_guid.is_none());
    assert_eq!(shared.linked_notebook_guid, Some(support::guid("ln-1")));
}

#[tokio::test]
async fn test_noteless_linked_notebook_tags_are_swept() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(MemoryLocalStore::new());

    store
        .linked_notebooks
        .lock()
        .unwrap()
        .push(linked_notebook("ln-1"));

    // A leftover shared tag no note references anymore
    let mut orphan = support::remote_tag("t-orphan", "orphan", 3, None);
    orphan.linked_notebook_guid = Some(support::guid("ln-1"));
    store.tags.lock().unwrap().push(orphan);

    remote.push_chunk(SyncChunk {
        current_time: 1_000,
        chunk_high_usn: None,
        update_count: 0,
        ..Default::default()
    });
    remote.linked_chunk_script.lock().unwrap().insert(
        support::guid("ln-1"),
        VecDeque::from([SyncChunk {
            current_time: 7_000,
            chunk_high_usn: None,
            update_count: 5,
            ..Default::default()
        }]),
    );

    let (mut engine, _rx, _limits_dir) = support::build_engine(remote, store.clone());
    engine.start(0).await.expect("sync failed");

    assert!(store.tags.lock().unwrap().is_empty());
}
