//! Test doubles for engine integration tests
//!
//! `MemoryLocalStore` is a full in-memory implementation of the local
//! store port with a write log the tests can assert ordering on.
//! `MockRemote` implements both remote gateways against scripted
//! responses. `StaticBroker` hands out fixed tokens.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use quillsync_core::domain::{
    AccountLimits, AuthToken, Guid, LinkedNotebook, Note, NoteSummary, Notebook, Resource,
    SavedSearch, Scope, ServiceLevel, ShardId, SyncChunk, SyncChunkFilter, SyncState, Tag, User,
    UserId, Usn,
};
use quillsync_core::ports::{
    AuthData, IAuthTokenBroker, ILocalStore, INoteStore, IUserStore, NoteFetchOptions,
    RemoteError, RemoteResult, ResourceFetchOptions,
};
use quillsync_sync::{LastSyncParameters, SyncEngine, SyncEvent};
use tokio::sync::mpsc::UnboundedReceiver;

pub fn guid(value: &str) -> Guid {
    Guid::new(value).unwrap()
}

// ============================================================================
// MemoryLocalStore
// ============================================================================

#[derive(Default)]
pub struct MemoryLocalStore {
    pub users: Mutex<Vec<User>>,
    pub notebooks: Mutex<Vec<Notebook>>,
    pub tags: Mutex<Vec<Tag>>,
    pub searches: Mutex<Vec<SavedSearch>>,
    pub notes: Mutex<Vec<Note>>,
    pub resources: Mutex<Vec<Resource>>,
    pub linked_notebooks: Mutex<Vec<LinkedNotebook>>,
    /// Operation log, e.g. `"add_tag t-1"`, for ordering assertions
    pub write_log: Mutex<Vec<String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, entry: String) {
        self.write_log.lock().unwrap().push(entry);
    }

    pub fn log_entries(&self) -> Vec<String> {
        self.write_log.lock().unwrap().clone()
    }

    pub fn notebook_by_guid(&self, g: &Guid) -> Option<Notebook> {
        self.notebooks
            .lock()
            .unwrap()
            .iter()
            .find(|nb| nb.guid.as_ref() == Some(g))
            .cloned()
    }

    pub fn note_by_guid(&self, g: &Guid) -> Option<Note> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.guid.as_ref() == Some(g))
            .cloned()
    }

    pub fn note_by_title(&self, title: &str) -> Option<Note> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.title.as_deref() == Some(title))
            .cloned()
    }

    fn notebook_scope_guid(&self, note: &Note) -> Option<Guid> {
        let notebooks = self.notebooks.lock().unwrap();
        notebooks
            .iter()
            .find(|nb| {
                (note.notebook_guid.is_some() && nb.guid == note.notebook_guid)
                    || (note.notebook_local_id == Some(nb.local_id))
            })
            .and_then(|nb| nb.linked_notebook_guid.clone())
    }

    fn scope_matches(scope: &Scope, linked_guid: &Option<Guid>) -> bool {
        match scope {
            Scope::UserOwn => linked_guid.is_none(),
            Scope::LinkedNotebook(g) => linked_guid.as_ref() == Some(g),
        }
    }
}

macro_rules! upsert_by_local_id {
    ($collection:expr, $item:expr) => {{
        let mut items = $collection.lock().unwrap();
        if let Some(existing) = items.iter_mut().find(|e| e.local_id == $item.local_id) {
            *existing = $item.clone();
        } else {
            items.push($item.clone());
        }
    }};
}

#[async_trait::async_trait]
impl ILocalStore for MemoryLocalStore {
    async fn put_user(&self, user: &User) -> anyhow::Result<()> {
        self.users.lock().unwrap().push(user.clone());
        self.log(format!("put_user {:?}", user.id));
        Ok(())
    }

    async fn find_notebook_by_guid(&self, g: &Guid) -> anyhow::Result<Option<Notebook>> {
        Ok(self.notebook_by_guid(g))
    }

    async fn find_notebook_by_name(
        &self,
        name: &str,
        scope: &Scope,
    ) -> anyhow::Result<Option<Notebook>> {
        Ok(self
            .notebooks
            .lock()
            .unwrap()
            .iter()
            .find(|nb| {
                nb.name
                    .as_deref()
                    .map(|n| n.eq_ignore_ascii_case(name))
                    .unwrap_or(false)
                    && Self::scope_matches(scope, &nb.linked_notebook_guid)
            })
            .cloned())
    }

    async fn add_notebook(&self, notebook: &Notebook) -> anyhow::Result<()> {
        self.log(format!(
            "add_notebook {}",
            notebook.guid.as_ref().map(Guid::as_str).unwrap_or("-")
        ));
        upsert_by_local_id!(self.notebooks, notebook);
        Ok(())
    }

    async fn update_notebook(&self, notebook: &Notebook) -> anyhow::Result<()> {
        self.log(format!(
            "update_notebook {}",
            notebook.guid.as_ref().map(Guid::as_str).unwrap_or("-")
        ));
        upsert_by_local_id!(self.notebooks, notebook);
        Ok(())
    }

    async fn expunge_notebook(&self, g: &Guid) -> anyhow::Result<()> {
        self.log(format!("expunge_notebook {g}"));
        let removed: Vec<Notebook> = {
            let mut notebooks = self.notebooks.lock().unwrap();
            let (gone, kept): (Vec<_>, Vec<_>) = notebooks
                .drain(..)
                .partition(|nb| nb.guid.as_ref() == Some(g));
            *notebooks = kept;
            gone
        };
        let mut notes = self.notes.lock().unwrap();
        notes.retain(|n| {
            !removed.iter().any(|nb| {
                (n.notebook_guid.is_some() && n.notebook_guid == nb.guid)
                    || n.notebook_local_id == Some(nb.local_id)
            })
        });
        Ok(())
    }

    async fn list_notebooks(&self, scope: &Scope) -> anyhow::Result<Vec<Notebook>> {
        Ok(self
            .notebooks
            .lock()
            .unwrap()
            .iter()
            .filter(|nb| Self::scope_matches(scope, &nb.linked_notebook_guid))
            .cloned()
            .collect())
    }

    async fn find_tag_by_guid(&self, g: &Guid) -> anyhow::Result<Option<Tag>> {
        Ok(self
            .tags
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.guid.as_ref() == Some(g))
            .cloned())
    }

    async fn find_tag_by_name(&self, name: &str, scope: &Scope) -> anyhow::Result<Option<Tag>> {
        Ok(self
            .tags
            .lock()
            .unwrap()
            .iter()
            .find(|t| {
                t.name
                    .as_deref()
                    .map(|n| n.eq_ignore_ascii_case(name))
                    .unwrap_or(false)
                    && Self::scope_matches(scope, &t.linked_notebook_guid)
            })
            .cloned())
    }

    async fn add_tag(&self, tag: &Tag) -> anyhow::Result<()> {
        self.log(format!(
            "add_tag {}",
            tag.guid.as_ref().map(Guid::as_str).unwrap_or("-")
        ));
        upsert_by_local_id!(self.tags, tag);
        Ok(())
    }

    async fn update_tag(&self, tag: &Tag) -> anyhow::Result<()> {
        self.log(format!(
            "update_tag {}",
            tag.guid.as_ref().map(Guid::as_str).unwrap_or("-")
        ));
        upsert_by_local_id!(self.tags, tag);
        Ok(())
    }

    async fn expunge_tag(&self, g: &Guid) -> anyhow::Result<()> {
        self.log(format!("expunge_tag {g}"));
        let mut tags = self.tags.lock().unwrap();
        let mut doomed: Vec<Guid> = vec![g.clone()];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i].clone();
            for tag in tags.iter() {
                if tag.parent_guid.as_ref() == Some(&parent) {
                    if let Some(child) = tag.guid.clone() {
                        if !doomed.contains(&child) {
                            doomed.push(child);
                        }
                    }
                }
            }
            i += 1;
        }
        tags.retain(|t| t.guid.as_ref().map(|g| !doomed.contains(g)).unwrap_or(true));
        Ok(())
    }

    async fn list_tags(&self, scope: &Scope) -> anyhow::Result<Vec<Tag>> {
        Ok(self
            .tags
            .lock()
            .unwrap()
            .iter()
            .filter(|t| Self::scope_matches(scope, &t.linked_notebook_guid))
            .cloned()
            .collect())
    }

    async fn expunge_noteless_linked_notebook_tags(&self) -> anyhow::Result<()> {
        self.log("expunge_noteless_linked_notebook_tags".to_string());
        let referenced: Vec<Guid> = self
            .notes
            .lock()
            .unwrap()
            .iter()
            .flat_map(|n| n.tag_guids.clone())
            .collect();
        self.tags.lock().unwrap().retain(|t| {
            t.linked_notebook_guid.is_none()
                || t.guid
                    .as_ref()
                    .map(|g| referenced.contains(g))
                    .unwrap_or(false)
        });
        Ok(())
    }

    async fn find_saved_search_by_guid(&self, g: &Guid) -> anyhow::Result<Option<SavedSearch>> {
        Ok(self
            .searches
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.guid.as_ref() == Some(g))
            .cloned())
    }

    async fn find_saved_search_by_name(&self, name: &str) -> anyhow::Result<Option<SavedSearch>> {
        Ok(self
            .searches
            .lock()
            .unwrap()
            .iter()
            .find(|s| {
                s.name
                    .as_deref()
                    .map(|n| n.eq_ignore_ascii_case(name))
                    .unwrap_or(false)
            })
            .cloned())
    }

    async fn add_saved_search(&self, search: &SavedSearch) -> anyhow::Result<()> {
        self.log(format!(
            "add_saved_search {}",
            search.guid.as_ref().map(Guid::as_str).unwrap_or("-")
        ));
        upsert_by_local_id!(self.searches, search);
        Ok(())
    }

    async fn update_saved_search(&self, search: &SavedSearch) -> anyhow::Result<()> {
        self.log(format!(
            "update_saved_search {}",
            search.guid.as_ref().map(Guid::as_str).unwrap_or("-")
        ));
        upsert_by_local_id!(self.searches, search);
        Ok(())
    }

    async fn expunge_saved_search(&self, g: &Guid) -> anyhow::Result<()> {
        self.log(format!("expunge_saved_search {g}"));
        self.searches
            .lock()
            .unwrap()
            .retain(|s| s.guid.as_ref() != Some(g));
        Ok(())
    }

    async fn list_saved_searches(&self) -> anyhow::Result<Vec<SavedSearch>> {
        Ok(self.searches.lock().unwrap().clone())
    }

    async fn find_note_by_guid(&self, g: &Guid) -> anyhow::Result<Option<Note>> {
        Ok(self.note_by_guid(g))
    }

    async fn add_note(&self, note: &Note) -> anyhow::Result<()> {
        self.log(format!(
            "add_note {}",
            note.guid.as_ref().map(Guid::as_str).unwrap_or("-")
        ));
        upsert_by_local_id!(self.notes, note);
        Ok(())
    }

    async fn update_note(&self, note: &Note) -> anyhow::Result<()> {
        self.log(format!(
            "update_note {}",
            note.guid.as_ref().map(Guid::as_str).unwrap_or("-")
        ));
        upsert_by_local_id!(self.notes, note);
        Ok(())
    }

    async fn expunge_note(&self, g: &Guid) -> anyhow::Result<()> {
        self.log(format!("expunge_note {g}"));
        self.notes
            .lock()
            .unwrap()
            .retain(|n| n.guid.as_ref() != Some(g));
        self.resources
            .lock()
            .unwrap()
            .retain(|r| r.note_guid.as_ref() != Some(g));
        Ok(())
    }

    async fn list_note_summaries(&self, scope: &Scope) -> anyhow::Result<Vec<NoteSummary>> {
        let notes = self.notes.lock().unwrap().clone();
        Ok(notes
            .iter()
            .filter(|n| {
                let linked = self.notebook_scope_guid(n);
                Self::scope_matches(scope, &linked)
            })
            .map(|n| NoteSummary {
                guid: n.guid.clone(),
                local_id: n.local_id,
                title: n.title.clone(),
                update_sequence_num: n.update_sequence_num,
                notebook_guid: n.notebook_guid.clone(),
                locally_modified: n.locally_modified,
            })
            .collect())
    }

    async fn find_resource_by_guid(&self, g: &Guid) -> anyhow::Result<Option<Resource>> {
        Ok(self
            .resources
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.guid.as_ref() == Some(g))
            .cloned())
    }

    async fn add_resource(&self, resource: &Resource) -> anyhow::Result<()> {
        self.log(format!(
            "add_resource {}",
            resource.guid.as_ref().map(Guid::as_str).unwrap_or("-")
        ));
        upsert_by_local_id!(self.resources, resource);
        Ok(())
    }

    async fn update_resource(&self, resource: &Resource) -> anyhow::Result<()> {
        self.log(format!(
            "update_resource {}",
            resource.guid.as_ref().map(Guid::as_str).unwrap_or("-")
        ));
        upsert_by_local_id!(self.resources, resource);
        Ok(())
    }

    async fn find_linked_notebook_by_guid(
        &self,
        g: &Guid,
    ) -> anyhow::Result<Option<LinkedNotebook>> {
        Ok(self
            .linked_notebooks
            .lock()
            .unwrap()
            .iter()
            .find(|ln| ln.guid.as_ref() == Some(g))
            .cloned())
    }

    async fn add_linked_notebook(&self, ln: &LinkedNotebook) -> anyhow::Result<()> {
        self.log(format!(
            "add_linked_notebook {}",
            ln.guid.as_ref().map(Guid::as_str).unwrap_or("-")
        ));
        self.linked_notebooks.lock().unwrap().push(ln.clone());
        Ok(())
    }

    async fn update_linked_notebook(&self, ln: &LinkedNotebook) -> anyhow::Result<()> {
        self.log(format!(
            "update_linked_notebook {}",
            ln.guid.as_ref().map(Guid::as_str).unwrap_or("-")
        ));
        let mut items = self.linked_notebooks.lock().unwrap();
        if let Some(existing) = items.iter_mut().find(|e| e.guid == ln.guid) {
            *existing = ln.clone();
        } else {
            items.push(ln.clone());
        }
        Ok(())
    }

    async fn expunge_linked_notebook(&self, g: &Guid) -> anyhow::Result<()> {
        self.log(format!("expunge_linked_notebook {g}"));
        self.linked_notebooks
            .lock()
            .unwrap()
            .retain(|ln| ln.guid.as_ref() != Some(g));
        let removed_notebooks: Vec<Notebook> = {
            let mut notebooks = self.notebooks.lock().unwrap();
            let (gone, kept): (Vec<_>, Vec<_>) = notebooks
                .drain(..)
                .partition(|nb| nb.linked_notebook_guid.as_ref() == Some(g));
            *notebooks = kept;
            gone
        };
        self.notes.lock().unwrap().retain(|n| {
            !removed_notebooks.iter().any(|nb| {
                (n.notebook_guid.is_some() && n.notebook_guid == nb.guid)
                    || n.notebook_local_id == Some(nb.local_id)
            })
        });
        self.tags
            .lock()
            .unwrap()
            .retain(|t| t.linked_notebook_guid.as_ref() != Some(g));
        Ok(())
    }

    async fn list_linked_notebooks(&self) -> anyhow::Result<Vec<LinkedNotebook>> {
        Ok(self.linked_notebooks.lock().unwrap().clone())
    }
}

// ============================================================================
// MockRemote
// ============================================================================

/// Scripted remote service implementing both gateway ports.
pub struct MockRemote {
    pub check_version_result: Mutex<bool>,
    pub user: Mutex<User>,
    pub sync_state: Mutex<Option<SyncState>>,
    /// Scripted responses for `get_sync_chunk`, popped per call
    pub chunk_script: Mutex<VecDeque<RemoteResult<SyncChunk>>>,
    /// `after_usn` of every `get_sync_chunk` call
    pub chunk_requests: Mutex<Vec<Usn>>,
    /// Full notes served by `get_note`
    pub full_notes: Mutex<HashMap<Guid, Note>>,
    /// Full resources served by `get_resource`
    pub full_resources: Mutex<HashMap<Guid, Resource>>,
    pub linked_sync_states: Mutex<HashMap<Guid, SyncState>>,
    pub linked_chunk_script: Mutex<HashMap<Guid, VecDeque<SyncChunk>>>,
    pub linked_chunk_requests: Mutex<Vec<(Guid, Usn)>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            check_version_result: Mutex::new(true),
            user: Mutex::new(User {
                id: Some(UserId::new(42)),
                username: Some("tester".to_string()),
                service_level: Some(ServiceLevel::Premium),
                shard_id: Some(ShardId::new("s1").unwrap()),
                ..Default::default()
            }),
            sync_state: Mutex::new(None),
            chunk_script: Mutex::new(VecDeque::new()),
            chunk_requests: Mutex::new(Vec::new()),
            full_notes: Mutex::new(HashMap::new()),
            full_resources: Mutex::new(HashMap::new()),
            linked_sync_states: Mutex::new(HashMap::new()),
            linked_chunk_script: Mutex::new(HashMap::new()),
            linked_chunk_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_chunk(&self, chunk: SyncChunk) {
        self.chunk_script.lock().unwrap().push_back(Ok(chunk));
    }

    pub fn push_chunk_error(&self, error: RemoteError) {
        self.chunk_script.lock().unwrap().push_back(Err(error));
    }

    pub fn serve_full_note(&self, note: Note) {
        let g = note.guid.clone().expect("full note needs a guid");
        self.full_notes.lock().unwrap().insert(g, note);
    }
}

#[async_trait::async_trait]
impl IUserStore for MockRemote {
    async fn check_version(
        &self,
        _client_name: &str,
        _major: i16,
        _minor: i16,
    ) -> RemoteResult<bool> {
        Ok(*self.check_version_result.lock().unwrap())
    }

    async fn get_user(&self, _auth_token: &AuthToken) -> RemoteResult<User> {
        Ok(self.user.lock().unwrap().clone())
    }

    async fn get_account_limits(
        &self,
        _service_level: ServiceLevel,
        _auth_token: &AuthToken,
    ) -> RemoteResult<AccountLimits> {
        Ok(AccountLimits {
            upload_limit: Some(10_000_000),
            ..Default::default()
        })
    }
}

#[async_trait::async_trait]
impl INoteStore for MockRemote {
    async fn get_sync_state(&self, _auth_token: &AuthToken) -> RemoteResult<SyncState> {
        self.sync_state
            .lock()
            .unwrap()
            .ok_or_else(|| RemoteError::api("no sync state scripted"))
    }

    async fn get_sync_chunk(
        &self,
        after_usn: Usn,
        _max_entries: i32,
        _filter: &SyncChunkFilter,
        _auth_token: &AuthToken,
    ) -> RemoteResult<SyncChunk> {
        self.chunk_requests.lock().unwrap().push(after_usn);
        self.chunk_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::api("chunk script exhausted")))
    }

    async fn get_linked_notebook_sync_state(
        &self,
        linked_notebook: &LinkedNotebook,
        _auth_token: &AuthToken,
    ) -> RemoteResult<SyncState> {
        let g = linked_notebook.guid.clone().unwrap();
        self.linked_sync_states
            .lock()
            .unwrap()
            .get(&g)
            .copied()
            .ok_or_else(|| RemoteError::api("no linked sync state scripted"))
    }

    async fn get_linked_notebook_sync_chunk(
        &self,
        linked_notebook: &LinkedNotebook,
        after_usn: Usn,
        _max_entries: i32,
        _full_sync_only: bool,
        _auth_token: &AuthToken,
    ) -> RemoteResult<SyncChunk> {
        let g = linked_notebook.guid.clone().unwrap();
        self.linked_chunk_requests
            .lock()
            .unwrap()
            .push((g.clone(), after_usn));
        self.linked_chunk_script
            .lock()
            .unwrap()
            .get_mut(&g)
            .and_then(|q| q.pop_front())
            .map(Ok)
            .unwrap_or_else(|| Err(RemoteError::api("linked chunk script exhausted")))
    }

    async fn get_note(
        &self,
        g: &Guid,
        _options: &NoteFetchOptions,
        _auth_token: &AuthToken,
    ) -> RemoteResult<Note> {
        self.full_notes
            .lock()
            .unwrap()
            .get(g)
            .cloned()
            .ok_or_else(|| RemoteError::api(format!("no full note scripted for {g}")))
    }

    async fn get_resource(
        &self,
        g: &Guid,
        _options: &ResourceFetchOptions,
        _auth_token: &AuthToken,
    ) -> RemoteResult<Resource> {
        self.full_resources
            .lock()
            .unwrap()
            .get(g)
            .cloned()
            .ok_or_else(|| RemoteError::api(format!("no full resource scripted for {g}")))
    }
}

// ============================================================================
// StaticBroker
// ============================================================================

pub struct StaticBroker;

#[async_trait::async_trait]
impl IAuthTokenBroker for StaticBroker {
    async fn user_auth_token(&self) -> anyhow::Result<AuthToken> {
        Ok(AuthToken::new("user-token"))
    }

    async fn refresh_user_auth_token(&self) -> anyhow::Result<AuthToken> {
        Ok(AuthToken::new("user-token-refreshed"))
    }

    async fn linked_notebook_auth(
        &self,
        linked_notebook: &LinkedNotebook,
    ) -> anyhow::Result<AuthData> {
        Ok(AuthData {
            token: AuthToken::new("ln-token"),
            expires_at: Utc::now() + Duration::hours(12),
            shard_id: linked_notebook.shard_id.clone(),
            note_store_url: linked_notebook.note_store_url.clone(),
        })
    }

    async fn refresh_linked_notebook_auth(
        &self,
        linked_notebooks: &[LinkedNotebook],
    ) -> anyhow::Result<HashMap<Guid, AuthData>> {
        let mut map = HashMap::new();
        for ln in linked_notebooks {
            if let Some(g) = &ln.guid {
                map.insert(
                    g.clone(),
                    AuthData {
                        token: AuthToken::new("ln-token-refreshed"),
                        expires_at: Utc::now() + Duration::hours(12),
                        shard_id: ln.shard_id.clone(),
                        note_store_url: ln.note_store_url.clone(),
                    },
                );
            }
        }
        Ok(map)
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Enables log output for failing tests (`RUST_LOG=debug cargo test ...`)
fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Builds an engine against the given doubles; the temp dir backs the
/// account-limits cache and must outlive the test.
pub fn build_engine(
    remote: Arc<MockRemote>,
    store: Arc<MemoryLocalStore>,
) -> (SyncEngine, UnboundedReceiver<SyncEvent>, tempfile::TempDir) {
    init_tracing();
    let limits_dir = tempfile::tempdir().unwrap();
    let (mut engine, rx) = SyncEngine::new(
        remote.clone(),
        remote,
        store,
        Arc::new(StaticBroker),
        "www.example.com",
    );
    engine.set_limits_cache(quillsync_core::config::AccountLimitsCache::new(
        limits_dir.path(),
    ));
    engine.set_last_sync_parameters(LastSyncParameters::cold_start());
    (engine, rx, limits_dir)
}

/// Drains every event currently in the channel
pub fn drain_events(rx: &mut UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// --- Entity builders ---

pub fn remote_notebook(guid_str: &str, name: &str, usn: Usn) -> Notebook {
    Notebook {
        guid: Some(guid(guid_str)),
        name: Some(name.to_string()),
        update_sequence_num: Some(usn),
        ..Notebook::new()
    }
}

pub fn remote_tag(guid_str: &str, name: &str, usn: Usn, parent: Option<&str>) -> Tag {
    Tag {
        guid: Some(guid(guid_str)),
        name: Some(name.to_string()),
        update_sequence_num: Some(usn),
        parent_guid: parent.map(guid),
        ..Tag::new()
    }
}

pub fn remote_search(guid_str: &str, name: &str, usn: Usn) -> SavedSearch {
    SavedSearch {
        guid: Some(guid(guid_str)),
        name: Some(name.to_string()),
        query: Some(format!("any:{name}")),
        update_sequence_num: Some(usn),
        ..SavedSearch::new()
    }
}

/// Note stub as a sync chunk carries it (no content)
pub fn chunk_note(guid_str: &str, title: &str, usn: Usn, notebook: &str) -> Note {
    Note {
        guid: Some(guid(guid_str)),
        title: Some(title.to_string()),
        update_sequence_num: Some(usn),
        notebook_guid: Some(guid(notebook)),
        ..Note::new()
    }
}

/// The corresponding full note as `get_note` returns it
pub fn full_note(guid_str: &str, title: &str, usn: Usn, notebook: &str) -> Note {
    let mut note = chunk_note(guid_str, title, usn, notebook);
    note.content = Some(format!("<en-note>{title}</en-note>"));
    note.content_length = note.content.as_ref().map(|c| c.len() as i32);
    note
}
