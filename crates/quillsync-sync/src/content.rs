//! Lazy full-content downloads
//!
//! Sync chunks carry note and resource *metadata* only. When the pipeline
//! decides a remote note must be added or updated locally, the note's guid
//! goes into a pending map here; the fetcher then downloads the full note
//! (body, resources, recognition data), overlays it onto the local
//! identity (local ids are preserved, server flags cleared), writes it to
//! the local store and schedules the best-effort thumbnail and ink-note
//! image downloads.
//!
//! A note contributes exactly one increment to the download progress
//! counter, and only after all of its related work has settled: body
//! fetched, thumbnail attempt finished, ink image attempts finished -
//! successfully or not.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use quillsync_core::config::SyncOptions;
use quillsync_core::domain::{Guid, LocalId, Note, Resource, Scope, Usn};
use quillsync_core::ports::{ILocalStore, INoteStore, NoteFetchOptions, ResourceFetchOptions};
use quillsync_conflict::TagSyncCache;
use tracing::{debug, warn};

use quillsync_web::{InkNoteImageDownloader, ThumbnailDownloader};

use crate::backoff::RemoteCaller;
use crate::error::SyncError;
use crate::events::{EventEmitter, ProcessingCounters, SyncEvent};

// ============================================================================
// Pending-USN bookkeeping
// ============================================================================

/// Tracks the USNs of entities that have been scheduled but not yet fully
/// processed, per scope.
///
/// Callers persist `smallest(scope) - 1`-style checkpoints so an aborted
/// session can resume without losing enqueued work.
#[derive(Debug, Default)]
pub struct PendingUsns {
    inner: Mutex<HashMap<Scope, BTreeSet<Usn>>>,
}

impl PendingUsns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scheduled entity's USN
    pub fn register(&self, scope: &Scope, usn: Usn) {
        self.inner
            .lock()
            .unwrap()
            .entry(scope.clone())
            .or_default()
            .insert(usn);
    }

    /// Marks an entity's USN as fully processed
    pub fn complete(&self, scope: &Scope, usn: Usn) {
        if let Some(set) = self.inner.lock().unwrap().get_mut(scope) {
            set.remove(&usn);
        }
    }

    /// Smallest USN not yet processed in `scope`, if any
    pub fn smallest(&self, scope: &Scope) -> Option<Usn> {
        self.inner
            .lock()
            .unwrap()
            .get(scope)
            .and_then(|set| set.iter().next().copied())
    }

    /// Smallest unprocessed USN for every linked-notebook scope
    pub fn smallest_per_linked_notebook(&self) -> HashMap<Guid, Usn> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(scope, set)| match scope {
                Scope::LinkedNotebook(guid) => set
                    .iter()
                    .next()
                    .map(|usn| (guid.clone(), *usn)),
                Scope::UserOwn => None,
            })
            .collect()
    }
}

// ============================================================================
// FullContentFetcher
// ============================================================================

/// One pending full-note download.
#[derive(Debug, Clone)]
struct PendingNote {
    /// Chunk-provided stub carrying the target local identity
    stub: Note,
    /// The prior local copy for updates (source of resource local ids)
    prior: Option<Note>,
}

/// Downloads full note and resource payloads for one scope.
pub struct FullContentFetcher {
    scope: Scope,
    caller: RemoteCaller,
    note_store: Arc<dyn INoteStore>,
    local_store: Arc<dyn ILocalStore>,
    emitter: EventEmitter,
    options: SyncOptions,
    thumbnail_downloader: Option<ThumbnailDownloader>,
    ink_image_downloader: Option<InkNoteImageDownloader>,
    pending_usns: Arc<PendingUsns>,

    pending_add: Vec<(Guid, PendingNote)>,
    pending_update: Vec<(Guid, PendingNote)>,
    /// Guids currently scheduled, guarding against double download
    in_flight: HashSet<Guid>,
    /// Note guids whose full download completed in this session; their
    /// standalone resource entries are already covered
    downloaded_notes: HashSet<Guid>,
}

impl FullContentFetcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scope: Scope,
        caller: RemoteCaller,
        note_store: Arc<dyn INoteStore>,
        local_store: Arc<dyn ILocalStore>,
        emitter: EventEmitter,
        options: SyncOptions,
        thumbnail_downloader: Option<ThumbnailDownloader>,
        ink_image_downloader: Option<InkNoteImageDownloader>,
        pending_usns: Arc<PendingUsns>,
    ) -> Self {
        Self {
            scope,
            caller,
            note_store,
            local_store,
            emitter,
            options,
            thumbnail_downloader,
            ink_image_downloader,
            pending_usns,
            pending_add: Vec::new(),
            pending_update: Vec::new(),
            in_flight: HashSet::new(),
            downloaded_notes: HashSet::new(),
        }
    }

    /// Schedules a brand-new remote note for full download
    pub fn enqueue_add(&mut self, guid: Guid, stub: Note) {
        if !self.in_flight.insert(guid.clone()) {
            debug!(%guid, "Note already scheduled, skipping duplicate");
            return;
        }
        if let Some(usn) = stub.update_sequence_num {
            self.pending_usns.register(&self.scope, usn);
        }
        self.pending_add.push((guid, PendingNote { stub, prior: None }));
    }

    /// Schedules an update of an existing local note for full download
    pub fn enqueue_update(&mut self, guid: Guid, stub: Note, prior: Note) {
        if !self.in_flight.insert(guid.clone()) {
            debug!(%guid, "Note already scheduled, skipping duplicate");
            return;
        }
        if let Some(usn) = stub.update_sequence_num {
            self.pending_usns.register(&self.scope, usn);
        }
        self.pending_update.push((
            guid,
            PendingNote {
                stub,
                prior: Some(prior),
            },
        ));
    }

    /// Returns true if the note's full download is scheduled or done;
    /// its resources arrive (or arrived) embedded.
    pub fn covers_note(&self, guid: &Guid) -> bool {
        self.in_flight.contains(guid) || self.downloaded_notes.contains(guid)
    }

    /// Downloads every pending note, writing each into the local store.
    pub async fn drain_notes(
        &mut self,
        tag_cache: &TagSyncCache,
        counters: &mut ProcessingCounters,
    ) -> Result<(), SyncError> {
        let adds = std::mem::take(&mut self.pending_add);
        let updates = std::mem::take(&mut self.pending_update);

        let total = (adds.len() + updates.len()) as u32;
        if total == 0 {
            return Ok(());
        }
        let mut done: u32 = 0;

        for (guid, pending, is_add) in adds
            .into_iter()
            .map(|(g, p)| (g, p, true))
            .chain(updates.into_iter().map(|(g, p)| (g, p, false)))
        {
            let scheduled_usn = pending.stub.update_sequence_num;
            let fetched = self.fetch_note(&guid).await?;
            self.apply_fetched_note(fetched, &pending, tag_cache, is_add).await?;

            if is_add {
                counters.notes_added += 1;
            } else {
                counters.notes_updated += 1;
            }

            if let Some(usn) = scheduled_usn {
                self.pending_usns.complete(&self.scope, usn);
            }
            self.in_flight.remove(&guid);
            self.downloaded_notes.insert(guid);

            done += 1;
            self.emit_note_progress(done, total);
        }

        Ok(())
    }

    async fn fetch_note(&self, guid: &Guid) -> Result<Note, SyncError> {
        let options = NoteFetchOptions::full();
        self.caller
            .call(&self.scope, "getNote", |token| {
                let store = self.note_store.clone();
                let guid = guid.clone();
                async move { store.get_note(&guid, &options, &token).await }
            })
            .await
    }

    /// Overlays a fully fetched note onto its local identity, persists
    /// it, and runs the auxiliary downloads.
    async fn apply_fetched_note(
        &self,
        fetched: Note,
        pending: &PendingNote,
        tag_cache: &TagSyncCache,
        is_add: bool,
    ) -> Result<Note, SyncError> {
        let mut merged = overlay_note(fetched, &pending.stub, pending.prior.as_ref(), tag_cache);

        if is_add {
            self.local_store.add_note(&merged).await?;
        } else {
            self.local_store.update_note(&merged).await?;
        }

        // Both auxiliary downloads are best-effort: failures are logged
        // and the note still counts as fully downloaded.
        if self.options.download_note_thumbnails && !merged.resources.is_empty() {
            self.download_thumbnail(&mut merged).await;
        }
        if self.options.download_ink_note_images && merged.is_ink_note() {
            self.download_ink_images(&merged).await;
        }

        Ok(merged)
    }

    async fn download_thumbnail(&self, note: &mut Note) {
        let Some(downloader) = &self.thumbnail_downloader else {
            return;
        };
        let Some(guid) = note.guid.clone() else {
            return;
        };
        match downloader.download(&guid).await {
            Ok(bytes) => {
                note.thumbnail_data = Some(bytes);
                if let Err(err) = self.local_store.update_note(note).await {
                    warn!(%guid, %err, "Failed to store downloaded note thumbnail");
                }
            }
            Err(err) => {
                warn!(%guid, %err, "Note thumbnail download failed, continuing without it");
            }
        }
    }

    async fn download_ink_images(&self, note: &Note) {
        let Some(downloader) = &self.ink_image_downloader else {
            return;
        };
        for resource in note.resources.iter().filter(|r| r.is_ink()) {
            let Some(guid) = &resource.guid else { continue };
            let (Some(width), Some(height)) = (resource.width, resource.height) else {
                debug!(%guid, "Ink resource lacks dimensions, skipping image download");
                continue;
            };
            if let Err(err) = downloader.download(guid, width, height).await {
                warn!(%guid, %err, "Ink note image download failed, continuing without it");
            }
        }
    }

    fn emit_note_progress(&self, done: u32, total: u32) {
        match &self.scope {
            Scope::UserOwn => self
                .emitter
                .emit(SyncEvent::NotesDownloadProgress { done, total }),
            Scope::LinkedNotebook(guid) => {
                self.emitter
                    .emit(SyncEvent::LinkedNotebookNotesDownloadProgress {
                        linked_notebook_guid: guid.clone(),
                        done,
                        total,
                    })
            }
        }
    }

    // ========================================================================
    // Standalone resource path (incremental sync)
    // ========================================================================

    /// Downloads one standalone resource, writes it, and marks the owning
    /// note as locally modified through an auxiliary note update.
    pub async fn fetch_resource(
        &self,
        remote: &Resource,
        prior: Option<&Resource>,
        counters: &mut ProcessingCounters,
    ) -> Result<(), SyncError> {
        let guid = remote.guid.clone().ok_or_else(|| {
            SyncError::data_shape("resource from sync chunk has no guid")
        })?;
        let note_guid = remote.note_guid.clone().ok_or_else(|| {
            SyncError::data_shape("resource from sync chunk has no note guid")
        })?;

        let options = ResourceFetchOptions::full();
        let fetched = self
            .caller
            .call(&self.scope, "getResource", |token| {
                let store = self.note_store.clone();
                let guid = guid.clone();
                async move { store.get_resource(&guid, &options, &token).await }
            })
            .await?;

        let owning_note = self.local_store.find_note_by_guid(&note_guid).await?;

        let mut merged = fetched;
        merged.local_id = prior.map(|p| p.local_id).unwrap_or_else(LocalId::new);
        merged.note_guid = Some(note_guid.clone());
        merged.note_local_id = owning_note.as_ref().map(|n| n.local_id);
        merged.locally_modified = false;

        if prior.is_some() {
            self.local_store.update_resource(&merged).await?;
            counters.resources_updated += 1;
        } else {
            self.local_store.add_resource(&merged).await?;
            counters.resources_added += 1;
        }

        // The owning note's resource set changed underneath it; flag the
        // note so the caller's next upload pass reconciles it.
        if let Some(mut note) = self.local_store.find_note_by_guid(&note_guid).await? {
            note.locally_modified = true;
            self.local_store.update_note(&note).await?;
        }

        if let Some(usn) = remote.update_sequence_num {
            self.pending_usns.complete(&self.scope, usn);
        }

        Ok(())
    }

    /// Emits the per-scope resource download progress event
    pub fn emit_resource_progress(&self, done: u32, total: u32) {
        match &self.scope {
            Scope::UserOwn => self
                .emitter
                .emit(SyncEvent::ResourcesDownloadProgress { done, total }),
            Scope::LinkedNotebook(guid) => {
                self.emitter
                    .emit(SyncEvent::LinkedNotebookResourcesDownloadProgress {
                        linked_notebook_guid: guid.clone(),
                        done,
                        total,
                    })
            }
        }
    }

    /// Registers a scheduled resource USN (see [`PendingUsns`])
    pub fn register_resource_usn(&self, usn: Option<Usn>) {
        if let Some(usn) = usn {
            self.pending_usns.register(&self.scope, usn);
        }
    }
}

/// Builds the note that lands in the local store: the fetched payload
/// under the stub's local identity, with local-change flags cleared and
/// resource local ids preserved from the prior local copy where guids
/// match.
fn overlay_note(
    fetched: Note,
    stub: &Note,
    prior: Option<&Note>,
    tag_cache: &TagSyncCache,
) -> Note {
    let mut merged = fetched;
    merged.local_id = stub.local_id;
    merged.notebook_local_id = stub.notebook_local_id;
    merged.locally_modified = false;
    merged.local_only = false;

    // Keep the previously downloaded thumbnail until a fresh one arrives
    merged.thumbnail_data = prior.and_then(|p| p.thumbnail_data.clone());

    merged.tag_local_ids = merged
        .tag_guids
        .iter()
        .filter_map(|guid| tag_cache.get_by_guid(guid).map(|tag| tag.local_id))
        .collect();

    let prior_resource_ids: HashMap<&Guid, LocalId> = prior
        .map(|p| {
            p.resources
                .iter()
                .filter_map(|r| r.guid.as_ref().map(|g| (g, r.local_id)))
                .collect()
        })
        .unwrap_or_default();

    for resource in &mut merged.resources {
        if let Some(guid) = &resource.guid {
            if let Some(local_id) = prior_resource_ids.get(guid) {
                resource.local_id = *local_id;
            }
        }
        resource.note_guid = merged.guid.clone();
        resource.note_local_id = Some(merged.local_id);
        resource.locally_modified = false;
    }

    merged
}
