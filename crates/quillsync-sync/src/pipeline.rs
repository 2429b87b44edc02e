//! Entity pipeline
//!
//! Consumes the sync chunks of one scope and reconciles their contents
//! against the local store:
//!
//! 1. Classify chunk entries into per-kind buffers (deduplicated by guid,
//!    highest USN wins) plus expunged-guid lists
//! 2. For each entity, probe the local store by guid; on a hit dispatch
//!    the matching conflict resolver, on a miss probe by name (named
//!    containers only) and otherwise add it as a brand-new clean item
//! 3. Tags are submitted in parent-before-child order; notes only start
//!    once tags and notebooks are fully reconciled; standalone resources
//!    only once notes are done (incremental sync only)

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use quillsync_core::domain::{
    Guid, LinkedNotebook, Note, Notebook, Resource, SavedSearch, Scope, SyncChunk, Tag,
};
use quillsync_core::ports::ILocalStore;
use quillsync_conflict::{
    CacheRegistry, ContainerResolution, LinkedNotebookConflictResolver, NoteConflictResolver,
    NoteResolution, NotebookConflictResolver, SavedSearchConflictResolver, TagConflictResolver,
};
use tracing::{debug, info, warn};

use crate::content::FullContentFetcher;
use crate::error::SyncError;
use crate::events::{EventEmitter, ProcessingCounters, SyncEvent};
use crate::session::SyncMode;

// ============================================================================
// Chunk classification
// ============================================================================

/// Per-kind buffers of everything the chunks of one scope carried.
#[derive(Debug, Clone, Default)]
pub struct ChunkContents {
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

/// Deduplicates by guid, keeping the entry with the higher USN (the same
/// entity may appear in several chunks when it was mutated while the
/// download loop ran).
macro_rules! merge_entities {
    ($target:expr, $index:expr, $incoming:expr) => {
        for entity in $incoming {
            match entity.guid.as_ref() {
                Some(guid) => match $index.get(guid) {
                    Some(&pos) => {
                        let existing: Option<i32> = $target[pos].update_sequence_num;
                        if entity.update_sequence_num >= existing {
                            $target[pos] = entity.clone();
                        }
                    }
                    None => {
                        $index.insert(guid.clone(), $target.len());
                        $target.push(entity.clone());
                    }
                },
                None => $target.push(entity.clone()),
            }
        }
    };
}

impl ChunkContents {
    /// Classifies a scope's chunk list into per-kind buffers
    pub fn collect(chunks: &[SyncChunk]) -> Self {
        let mut contents = Self::default();
        let mut notebook_index: HashMap<Guid, usize> = HashMap::new();
        let mut tag_index: HashMap<Guid, usize> = HashMap::new();
        let mut search_index: HashMap<Guid, usize> = HashMap::new();
        let mut note_index: HashMap<Guid, usize> = HashMap::new();
        let mut resource_index: HashMap<Guid, usize> = HashMap::new();
        let mut linked_index: HashMap<Guid, usize> = HashMap::new();

        for chunk in chunks {
            merge_entities!(contents.notebooks, notebook_index, &chunk.notebooks);
            merge_entities!(contents.tags, tag_index, &chunk.tags);
            merge_entities!(contents.searches, search_index, &chunk.searches);
            merge_entities!(contents.notes, note_index, &chunk.notes);
            merge_entities!(contents.resources, resource_index, &chunk.resources);
            merge_entities!(
                contents.linked_notebooks,
                linked_index,
                &chunk.linked_notebooks
            );

            contents.expunged_notes.extend(chunk.expunged_notes.iter().cloned());
            contents
                .expunged_notebooks
                .extend(chunk.expunged_notebooks.iter().cloned());
            contents.expunged_tags.extend(chunk.expunged_tags.iter().cloned());
            contents
                .expunged_searches
                .extend(chunk.expunged_searches.iter().cloned());
            contents
                .expunged_linked_notebooks
                .extend(chunk.expunged_linked_notebooks.iter().cloned());
        }

        contents
    }

    /// Guid set of the notebooks the chunks expunge (note conflict copies
    /// must not land in them)
    pub fn expunged_notebook_guids(&self) -> HashSet<Guid> {
        self.expunged_notebooks.iter().cloned().collect()
    }
}

/// Guids observed as added/updated in one scope's sync. After a repeat
/// full sync, local items with a remote guid absent from this set are the
/// server's silent deletions.
#[derive(Debug, Clone, Default)]
pub struct ObservedGuids {
    pub notebooks: HashSet<Guid>,
    pub tags: HashSet<Guid>,
    pub searches: HashSet<Guid>,
    pub notes: HashSet<Guid>,
}

impl ObservedGuids {
    pub fn from_contents(contents: &ChunkContents) -> Self {
        fn guids<'a, I: IntoIterator<Item = Option<&'a Guid>>>(iter: I) -> HashSet<Guid> {
            iter.into_iter().flatten().cloned().collect()
        }
        Self {
            notebooks: guids(contents.notebooks.iter().map(|e| e.guid.as_ref())),
            tags: guids(contents.tags.iter().map(|e| e.guid.as_ref())),
            searches: guids(contents.searches.iter().map(|e| e.guid.as_ref())),
            notes: guids(contents.notes.iter().map(|e| e.guid.as_ref())),
        }
    }
}

// ============================================================================
// Tag ordering
// ============================================================================

/// Stable topological sort of tags by parent guid.
///
/// Every tag whose parent is in the input comes after that parent; tags
/// with absent or external parents keep their relative order. Cycles
/// cannot legally occur, but if one does the tag with the highest USN in
/// the stuck set has its parent reference cleared so the sort always
/// terminates.
pub fn sort_tags_topologically(tags: Vec<Tag>) -> Vec<Tag> {
    let input_guids: HashSet<Guid> = tags.iter().filter_map(|t| t.guid.clone()).collect();
    let mut output = Vec::with_capacity(tags.len());
    let mut emitted: HashSet<Guid> = HashSet::new();
    let mut remaining = tags;

    while !remaining.is_empty() {
        let mut still = Vec::new();
        let mut progressed = false;

        for tag in remaining {
            let ready = match &tag.parent_guid {
                Some(parent) => !input_guids.contains(parent) || emitted.contains(parent),
                None => true,
            };
            if ready {
                if let Some(guid) = &tag.guid {
                    emitted.insert(guid.clone());
                }
                output.push(tag);
                progressed = true;
            } else {
                still.push(tag);
            }
        }

        remaining = still;

        if !progressed && !remaining.is_empty() {
            // Cycle break: youngest (highest USN) tag loses its parent
            let idx = remaining
                .iter()
                .enumerate()
                .max_by_key(|(_, tag)| tag.update_sequence_num.unwrap_or(0))
                .map(|(i, _)| i)
                .unwrap_or(0);
            warn!(
                guid = ?remaining[idx].guid,
                "Tag parent cycle detected, clearing parent reference"
            );
            remaining[idx].parent_guid = None;
            remaining[idx].parent_local_id = None;
        }
    }

    output
}

// ============================================================================
// ScopePipeline
// ============================================================================

/// Reconciles one scope's chunk contents against the local store.
pub struct ScopePipeline {
    scope: Scope,
    mode: SyncMode,
    local_store: Arc<dyn ILocalStore>,
    emitter: EventEmitter,
    counters: ProcessingCounters,
    notebook_resolver: NotebookConflictResolver,
    tag_resolver: TagConflictResolver,
    search_resolver: SavedSearchConflictResolver,
    note_resolver: NoteConflictResolver,
}

impl ScopePipeline {
    pub fn new(
        scope: Scope,
        mode: SyncMode,
        local_store: Arc<dyn ILocalStore>,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            scope,
            mode,
            local_store: local_store.clone(),
            emitter,
            counters: ProcessingCounters::default(),
            notebook_resolver: NotebookConflictResolver::new(local_store.clone()),
            tag_resolver: TagConflictResolver::new(local_store.clone()),
            search_resolver: SavedSearchConflictResolver::new(local_store.clone()),
            note_resolver: NoteConflictResolver::new(local_store),
        }
    }

    /// Runs the full reconciliation for this scope.
    ///
    /// Kind order per the service's dependency rules: saved searches and
    /// linked notebooks (user scope only), then tags, then notebooks,
    /// then notes, then standalone resources (incremental only).
    pub async fn run(
        mut self,
        contents: &ChunkContents,
        caches: &mut CacheRegistry,
        fetcher: &mut FullContentFetcher,
    ) -> Result<ProcessingCounters, SyncError> {
        info!(
            scope = %self.scope,
            notebooks = contents.notebooks.len(),
            tags = contents.tags.len(),
            searches = contents.searches.len(),
            notes = contents.notes.len(),
            resources = contents.resources.len(),
            "Starting entity pipeline"
        );

        let cache_set = caches.filled(self.local_store.as_ref(), &self.scope).await?;

        if self.scope.is_user_own() {
            self.process_saved_searches(contents, &mut cache_set.searches)
                .await?;
            self.process_linked_notebooks(contents).await?;
        }

        self.process_tags(contents, &mut cache_set.tags).await?;
        self.process_notebooks(contents, &mut cache_set.notebooks)
            .await?;
        self.process_notes(contents, fetcher).await?;
        fetcher
            .drain_notes(&cache_set.tags, &mut self.counters)
            .await?;
        self.emit_processing_progress();

        if matches!(self.mode, SyncMode::Incremental) {
            self.process_resources(contents, fetcher).await?;
            // Resource conflicts reschedule their owning notes for a
            // fresh full download
            fetcher
                .drain_notes(&cache_set.tags, &mut self.counters)
                .await?;
            self.emit_processing_progress();
        }

        info!(scope = %self.scope, "Entity pipeline complete");
        Ok(self.counters)
    }

    // ========================================================================
    // Named containers
    // ========================================================================

    async fn process_saved_searches(
        &mut self,
        contents: &ChunkContents,
        cache: &mut quillsync_conflict::SavedSearchSyncCache,
    ) -> Result<(), SyncError> {
        for remote in &contents.searches {
            let guid = require_guid(remote.guid.as_ref(), "saved search")?;
            let remote = remote.clone();

            if let Some(local) = self.local_store.find_saved_search_by_guid(guid).await? {
                match self
                    .search_resolver
                    .resolve_by_guid(remote, local, cache)
                    .await?
                {
                    ContainerResolution::TakeRemote { merged } => {
                        self.local_store.update_saved_search(&merged).await?;
                        self.counters.saved_searches_updated += 1;
                    }
                    ContainerResolution::KeepLocal => {}
                }
                continue;
            }

            let name = require_name(remote.name.as_deref(), "saved search")?;
            if let Some(local) = self.local_store.find_saved_search_by_name(name).await? {
                let local_id = local.local_id;
                match self
                    .search_resolver
                    .resolve_by_name(remote, local, cache)
                    .await?
                {
                    ContainerResolution::TakeRemote { merged } => {
                        if merged.local_id == local_id {
                            self.local_store.update_saved_search(&merged).await?;
                            self.counters.saved_searches_updated += 1;
                        } else {
                            self.local_store.add_saved_search(&merged).await?;
                            self.counters.saved_searches_added += 1;
                        }
                    }
                    ContainerResolution::KeepLocal => {}
                }
                continue;
            }

            let mut fresh = remote;
            fresh.locally_modified = false;
            fresh.local_only = false;
            self.local_store.add_saved_search(&fresh).await?;
            cache.put(fresh);
            self.counters.saved_searches_added += 1;
        }

        self.emit_processing_progress();
        Ok(())
    }

    async fn process_linked_notebooks(&mut self, contents: &ChunkContents) -> Result<(), SyncError> {
        let resolver = LinkedNotebookConflictResolver;
        for remote in &contents.linked_notebooks {
            let guid = require_guid(remote.guid.as_ref(), "linked notebook")?;

            if let Some(local) = self.local_store.find_linked_notebook_by_guid(guid).await? {
                let merged = resolver.resolve(remote.clone(), local)?;
                self.local_store.update_linked_notebook(&merged).await?;
                self.counters.linked_notebooks_updated += 1;
            } else {
                self.local_store.add_linked_notebook(remote).await?;
                self.counters.linked_notebooks_added += 1;
            }
        }

        self.emit_processing_progress();
        Ok(())
    }

    async fn process_tags(
        &mut self,
        contents: &ChunkContents,
        cache: &mut quillsync_conflict::TagSyncCache,
    ) -> Result<(), SyncError> {
        let chunk_tag_guids: HashSet<Guid> =
            contents.tags.iter().filter_map(|t| t.guid.clone()).collect();

        let mut tags = contents.tags.clone();
        for tag in &mut tags {
            tag.linked_notebook_guid = self.scope.linked_notebook_guid().cloned();

            // A linked notebook shares a subtree of the owner's tags; a
            // parent outside both the chunk and the scope's local cache is
            // invisible here and the reference must be dropped.
            if !self.scope.is_user_own() {
                if let Some(parent) = &tag.parent_guid {
                    if !chunk_tag_guids.contains(parent) && cache.get_by_guid(parent).is_none() {
                        debug!(
                            guid = ?tag.guid,
                            parent = %parent,
                            "Clearing parent reference outside the linked notebook"
                        );
                        tag.parent_guid = None;
                        tag.parent_local_id = None;
                    }
                }
            }
        }

        for remote in sort_tags_topologically(tags) {
            let guid = require_guid(remote.guid.as_ref(), "tag")?.clone();

            if let Some(local) = self.local_store.find_tag_by_guid(&guid).await? {
                match self.tag_resolver.resolve_by_guid(remote, local, cache).await? {
                    ContainerResolution::TakeRemote { merged } => {
                        self.local_store.update_tag(&merged).await?;
                        self.counters.tags_updated += 1;
                    }
                    ContainerResolution::KeepLocal => {}
                }
                continue;
            }

            let name = require_name(remote.name.as_deref(), "tag")?.to_string();
            if let Some(local) = self
                .local_store
                .find_tag_by_name(&name, &self.scope)
                .await?
            {
                let local_id = local.local_id;
                match self.tag_resolver.resolve_by_name(remote, local, cache).await? {
                    ContainerResolution::TakeRemote { merged } => {
                        if merged.local_id == local_id {
                            self.local_store.update_tag(&merged).await?;
                            self.counters.tags_updated += 1;
                        } else {
                            self.local_store.add_tag(&merged).await?;
                            self.counters.tags_added += 1;
                        }
                    }
                    ContainerResolution::KeepLocal => {}
                }
                continue;
            }

            let mut fresh = remote;
            fresh.locally_modified = false;
            fresh.local_only = false;
            if let Some(parent) = &fresh.parent_guid {
                fresh.parent_local_id = cache.get_by_guid(parent).map(|t| t.local_id);
            }
            self.local_store.add_tag(&fresh).await?;
            cache.put(fresh);
            self.counters.tags_added += 1;
        }

        self.emit_processing_progress();
        Ok(())
    }

    async fn process_notebooks(
        &mut self,
        contents: &ChunkContents,
        cache: &mut quillsync_conflict::NotebookSyncCache,
    ) -> Result<(), SyncError> {
        for remote in &contents.notebooks {
            let guid = require_guid(remote.guid.as_ref(), "notebook")?;
            let mut remote = remote.clone();
            remote.linked_notebook_guid = self.scope.linked_notebook_guid().cloned();

            if let Some(local) = self.local_store.find_notebook_by_guid(guid).await? {
                match self
                    .notebook_resolver
                    .resolve_by_guid(remote, local, cache)
                    .await?
                {
                    ContainerResolution::TakeRemote { merged } => {
                        self.local_store.update_notebook(&merged).await?;
                        self.counters.notebooks_updated += 1;
                    }
                    ContainerResolution::KeepLocal => {}
                }
                continue;
            }

            let name = require_name(remote.name.as_deref(), "notebook")?.to_string();
            if let Some(local) = self
                .local_store
                .find_notebook_by_name(&name, &self.scope)
                .await?
            {
                let local_id = local.local_id;
                match self
                    .notebook_resolver
                    .resolve_by_name(remote, local, cache)
                    .await?
                {
                    ContainerResolution::TakeRemote { merged } => {
                        if merged.local_id == local_id {
                            self.local_store.update_notebook(&merged).await?;
                            self.counters.notebooks_updated += 1;
                        } else {
                            self.local_store.add_notebook(&merged).await?;
                            self.counters.notebooks_added += 1;
                        }
                    }
                    ContainerResolution::KeepLocal => {}
                }
                continue;
            }

            let mut fresh = remote;
            fresh.locally_modified = false;
            fresh.local_only = false;
            self.local_store.add_notebook(&fresh).await?;
            cache.put(fresh);
            self.counters.notebooks_added += 1;
        }

        self.emit_processing_progress();
        Ok(())
    }

    // ========================================================================
    // Notes and resources
    // ========================================================================

    async fn process_notes(
        &mut self,
        contents: &ChunkContents,
        fetcher: &mut FullContentFetcher,
    ) -> Result<(), SyncError> {
        let expunged_notebooks = contents.expunged_notebook_guids();

        for remote in &contents.notes {
            let guid = require_guid(remote.guid.as_ref(), "note")?.clone();
            if remote.update_sequence_num.is_none() {
                return Err(SyncError::data_shape("note from sync chunk has no USN"));
            }
            let notebook_guid = remote.notebook_guid.clone().ok_or_else(|| {
                SyncError::data_shape("note from sync chunk has no notebook guid")
            })?;

            // The owning notebook was reconciled in the notebook phase;
            // its lookup supplies the local id the note must bind to.
            let notebook = self.local_store.find_notebook_by_guid(&notebook_guid).await?;
            let mut stub = remote.clone();
            stub.notebook_local_id = notebook.as_ref().map(|nb| nb.local_id);

            match self.local_store.find_note_by_guid(&guid).await? {
                Some(local) => {
                    match self
                        .note_resolver
                        .resolve(&stub, local.clone(), &expunged_notebooks)
                        .await?
                    {
                        NoteResolution::KeepLocal => {}
                        NoteResolution::TakeRemote { local_id } => {
                            stub.local_id = local_id;
                            fetcher.enqueue_update(guid, stub, local);
                        }
                    }
                }
                None => {
                    fetcher.enqueue_add(guid, stub);
                }
            }
        }

        Ok(())
    }

    async fn process_resources(
        &mut self,
        contents: &ChunkContents,
        fetcher: &mut FullContentFetcher,
    ) -> Result<(), SyncError> {
        let expunged_notebooks = contents.expunged_notebook_guids();

        let pending: Vec<&Resource> = contents
            .resources
            .iter()
            .filter(|res| {
                res.note_guid
                    .as_ref()
                    .map(|note_guid| !fetcher.covers_note(note_guid))
                    .unwrap_or(true)
            })
            .collect();

        let total = pending.len() as u32;
        let mut done: u32 = 0;

        for remote in pending {
            let guid = require_guid(remote.guid.as_ref(), "resource")?.clone();
            let note_guid = remote.note_guid.clone().ok_or_else(|| {
                SyncError::data_shape("resource from sync chunk has no note guid")
            })?;
            fetcher.register_resource_usn(remote.update_sequence_num);

            let prior = self.local_store.find_resource_by_guid(&guid).await?;

            if prior.as_ref().map(|r| r.locally_modified).unwrap_or(false) {
                // A dirty local resource means the owning note diverged;
                // route the whole note through the conflict path.
                self.resolve_resource_conflict(&note_guid, fetcher, &expunged_notebooks)
                    .await?;
            } else {
                fetcher
                    .fetch_resource(remote, prior.as_ref(), &mut self.counters)
                    .await?;
            }

            done += 1;
            fetcher.emit_resource_progress(done, total);
        }

        self.emit_processing_progress();
        Ok(())
    }

    /// Resource conflict handling: fetch the owning note's remote copy
    /// and run note conflict resolution with the local copy treated as
    /// modified.
    async fn resolve_resource_conflict(
        &mut self,
        note_guid: &Guid,
        fetcher: &mut FullContentFetcher,
        expunged_notebooks: &HashSet<Guid>,
    ) -> Result<(), SyncError> {
        let Some(mut local) = self.local_store.find_note_by_guid(note_guid).await? else {
            return Err(SyncError::data_shape(
                "dirty resource belongs to a note missing from the local store",
            ));
        };
        local.locally_modified = true;

        // The chunk carried only the resource; build the remote-note view
        // from the local copy's identity so the resolver can fork it, then
        // schedule the authoritative full download.
        let mut remote_stub = local.clone();
        remote_stub.update_sequence_num = Some(i32::MAX);

        match self
            .note_resolver
            .resolve(&remote_stub, local.clone(), expunged_notebooks)
            .await?
        {
            NoteResolution::KeepLocal => {}
            NoteResolution::TakeRemote { local_id } => {
                let mut stub = local.clone();
                stub.local_id = local_id;
                fetcher.enqueue_update(note_guid.clone(), stub, local);
            }
        }
        Ok(())
    }

    fn emit_processing_progress(&self) {
        match &self.scope {
            Scope::UserOwn => self
                .emitter
                .emit(SyncEvent::SyncChunksDataProcessingProgress {
                    counters: self.counters,
                }),
            Scope::LinkedNotebook(guid) => {
                self.emitter
                    .emit(SyncEvent::LinkedNotebookSyncChunksDataProcessingProgress {
                        linked_notebook_guid: guid.clone(),
                        counters: self.counters,
                    })
            }
        }
    }
}

fn require_guid<'a>(guid: Option<&'a Guid>, entity: &str) -> Result<&'a Guid, SyncError> {
    guid.ok_or_else(|| SyncError::data_shape(format!("{entity} from sync chunk has no guid")))
}

fn require_name<'a>(name: Option<&'a str>, entity: &str) -> Result<&'a str, SyncError> {
    name.ok_or_else(|| SyncError::data_shape(format!("{entity} from sync chunk has no name")))
}
