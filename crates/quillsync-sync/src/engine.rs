//! The synchronization orchestrator
//!
//! [`SyncEngine`] owns one sync session and advances through its phases
//! in order: protocol check, user fetch, sync-state check, chunk
//! download, entity pipeline, expunge, linked-notebook fan-out, finalize.
//! Each phase suspends at its gateway calls; rate limits and token expiry
//! are absorbed by the retry layer; `stop()` cancels the session from any
//! phase.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use quillsync_core::config::{AccountLimitsCache, SyncOptions};
use quillsync_core::domain::{
    AccountLimits, ErrorString, Guid, LinkedNotebook, Scope, ServiceLevel, ShardId, User, Usn,
};
use quillsync_core::ports::{IAuthTokenBroker, ILocalStore, INoteStore, IUserStore};
use quillsync_conflict::CacheRegistry;
use quillsync_web::{InkNoteImageDownloader, ThumbnailDownloader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::{AuthState, RemoteCaller};
use crate::chunks::{self, DownloadedChunks};
use crate::content::{FullContentFetcher, PendingUsns};
use crate::error::SyncError;
use crate::events::{EventEmitter, SyncEvent};
use crate::expunge;
use crate::pipeline::{ChunkContents, ObservedGuids, ScopePipeline};
use crate::session::{
    LastSyncParameters, LinkedNotebookSyncParams, SyncMode, SyncSummary,
};

/// Client name reported to the protocol version check
pub const CLIENT_NAME: &str = "Quillsync";
/// Protocol version this client implements
pub const PROTOCOL_VERSION_MAJOR: i16 = 1;
pub const PROTOCOL_VERSION_MINOR: i16 = 28;

/// Handle for cancelling a running session from another task.
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    /// Aborts the session; safe to call from any state, including after
    /// the session already finished.
    pub fn stop(&self) {
        self.token.cancel();
    }
}

/// The remote-to-local synchronization engine.
pub struct SyncEngine {
    user_store: Arc<dyn IUserStore>,
    note_store: Arc<dyn INoteStore>,
    local_store: Arc<dyn ILocalStore>,
    auth: Arc<AuthState>,
    emitter: EventEmitter,
    cancel: CancellationToken,
    options: SyncOptions,
    limits_cache: AccountLimitsCache,
    /// Service host for thumbnail and ink-image URLs
    host: String,
    last_sync_params: Option<LastSyncParameters>,
    /// The protocol check runs once per session
    protocol_checked: bool,
    pending_usns: Arc<PendingUsns>,
}

impl SyncEngine {
    /// Creates an engine and the receiving end of its event channel.
    pub fn new(
        user_store: Arc<dyn IUserStore>,
        note_store: Arc<dyn INoteStore>,
        local_store: Arc<dyn ILocalStore>,
        auth_broker: Arc<dyn IAuthTokenBroker>,
        host: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (emitter, rx) = EventEmitter::channel();
        let engine = Self {
            user_store,
            note_store,
            local_store,
            auth: Arc::new(AuthState::new(auth_broker)),
            emitter,
            cancel: CancellationToken::new(),
            options: SyncOptions::default(),
            limits_cache: AccountLimitsCache::new(AccountLimitsCache::default_dir()),
            host: host.into(),
            last_sync_params: None,
            protocol_checked: false,
            pending_usns: Arc::new(PendingUsns::new()),
        };
        (engine, rx)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn set_download_note_thumbnails(&mut self, enabled: bool) {
        self.options.download_note_thumbnails = enabled;
    }

    pub fn set_download_ink_note_images(&mut self, enabled: bool) {
        self.options.download_ink_note_images = enabled;
    }

    /// Sets the ink-note image directory. Validation happens lazily: an
    /// unusable path falls back to the OS default when downloads start.
    pub fn set_ink_note_images_storage_path(&mut self, path: PathBuf) {
        self.options.ink_note_images_storage_path = Some(path);
    }

    pub fn set_options(&mut self, options: SyncOptions) {
        self.options = options;
    }

    /// Replaces the account-limits cache location (defaults to the OS
    /// cache directory)
    pub fn set_limits_cache(&mut self, cache: AccountLimitsCache) {
        self.limits_cache = cache;
    }

    /// Supplies the previous session's checkpoints. Must be called before
    /// [`SyncEngine::start`].
    pub fn set_last_sync_parameters(&mut self, params: LastSyncParameters) {
        self.last_sync_params = Some(params);
    }

    /// Returns a handle that cancels this session
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            token: self.cancel.clone(),
        }
    }

    /// Cancels the session
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Smallest USN not yet fully processed, for the user's own scope and
    /// per linked notebook. Callers persist checkpoints strictly below
    /// these values when a session aborts.
    pub fn collect_non_processed_items_smallest_usns(
        &self,
    ) -> (Option<Usn>, HashMap<Guid, Usn>) {
        (
            self.pending_usns.smallest(&Scope::UserOwn),
            self.pending_usns.smallest_per_linked_notebook(),
        )
    }

    // ========================================================================
    // Session entry point
    // ========================================================================

    /// Runs one sync session, resuming from `after_usn` (0 selects a full
    /// sync). Emits `Finished`, `Stopped` or `Failure` and returns the
    /// matching result.
    pub async fn start(&mut self, after_usn: Usn) -> Result<SyncSummary, SyncError> {
        let result = self.run_phases(after_usn).await;
        match &result {
            Ok(summary) => {
                self.emitter.emit(SyncEvent::Finished {
                    last_update_count: summary.last_update_count,
                    last_sync_time: summary.last_sync_time,
                    linked_notebooks: summary.linked_notebooks.clone(),
                });
            }
            Err(SyncError::Stopped) => self.emitter.emit(SyncEvent::Stopped),
            Err(err) => self.emitter.emit(SyncEvent::Failure {
                error: err.to_error_string(),
            }),
        }
        result
    }

    async fn run_phases(&mut self, after_usn: Usn) -> Result<SyncSummary, SyncError> {
        let params = self
            .last_sync_params
            .clone()
            .ok_or(SyncError::MissingSyncParameters)?;

        let caller = RemoteCaller::new(
            self.auth.clone(),
            self.emitter.clone(),
            self.cancel.clone(),
        );

        // Phase 1: protocol check
        self.check_protocol_version(&caller).await?;

        // Phase 2: user record and account limits
        let user = self.fetch_user(&caller).await?;
        let _limits = self.fetch_account_limits(&caller, &user).await?;

        // Phase 3: user-scope sync-state check
        let mut mode = SyncMode::from_after_usn(after_usn);
        let mut after = after_usn;
        let mut skip_user_download = false;
        if params.last_update_count > 0 {
            let state = caller
                .call(&Scope::UserOwn, "getSyncState", |token| {
                    let store = self.note_store.clone();
                    async move { store.get_sync_state(&token).await }
                })
                .await?;

            if state.full_sync_before > params.last_sync_time {
                info!(
                    full_sync_before = state.full_sync_before,
                    last_sync_time = params.last_sync_time,
                    "Server requires a new full sync of the user's own account"
                );
                mode = SyncMode::Full;
                after = 0;
            } else if state.update_count == params.last_update_count {
                info!("User's own account is already up to date, skipping chunk download");
                skip_user_download = true;
            }
        }

        let mut summary = SyncSummary {
            last_update_count: params.last_update_count,
            last_sync_time: params.last_sync_time,
            linked_notebooks: HashMap::new(),
        };
        let mut caches = CacheRegistry::new();

        // Phases 4-6: chunk download, pipeline, expunge for the user scope
        if !skip_user_download {
            let downloaded = chunks::download_chunks(
                &caller,
                self.note_store.clone(),
                &Scope::UserOwn,
                None,
                mode,
                after,
                params.last_update_count,
                params.last_sync_time,
                &self.emitter,
            )
            .await?;
            summary.last_update_count = downloaded.last_update_count;
            summary.last_sync_time = downloaded.last_sync_time;

            self.process_scope(
                &caller,
                &Scope::UserOwn,
                None,
                user.shard_id.clone(),
                mode,
                &downloaded,
                &mut caches,
                // Repeat full sync: this scope completed a full sync
                // before, so absent guids are server-side deletions
                params.last_sync_time > 0,
            )
            .await?;
        }

        self.emitter
            .emit(SyncEvent::SynchronizedContentFromUsersOwnAccount {
                last_update_count: summary.last_update_count,
                last_sync_time: summary.last_sync_time,
            });

        // Phase 7: linked notebooks
        self.sync_linked_notebooks(&caller, &params, &mut summary, &mut caches)
            .await?;

        // Phase 8 happens in `start`: emit Finished and go inactive
        Ok(summary)
    }

    // ========================================================================
    // Individual phases
    // ========================================================================

    async fn check_protocol_version(&mut self, caller: &RemoteCaller) -> Result<(), SyncError> {
        if self.protocol_checked {
            return Ok(());
        }
        let accepted = caller
            .call(&Scope::UserOwn, "checkVersion", |_token| {
                let store = self.user_store.clone();
                async move {
                    store
                        .check_version(CLIENT_NAME, PROTOCOL_VERSION_MAJOR, PROTOCOL_VERSION_MINOR)
                        .await
                }
            })
            .await?;
        if !accepted {
            return Err(SyncError::ProtocolVersion(ErrorString::new(format!(
                "the service no longer accepts protocol version \
                 {PROTOCOL_VERSION_MAJOR}.{PROTOCOL_VERSION_MINOR}"
            ))));
        }
        self.protocol_checked = true;
        debug!("Protocol version accepted");
        Ok(())
    }

    async fn fetch_user(&self, caller: &RemoteCaller) -> Result<User, SyncError> {
        let user = caller
            .call(&Scope::UserOwn, "getUser", |token| {
                let store = self.user_store.clone();
                async move { store.get_user(&token).await }
            })
            .await?;
        self.local_store.put_user(&user).await?;
        info!(user_id = ?user.id, "Fetched and stored the user's account record");
        Ok(user)
    }

    /// Account limits, served from the 30-day cache when fresh.
    async fn fetch_account_limits(
        &self,
        caller: &RemoteCaller,
        user: &User,
    ) -> Result<AccountLimits, SyncError> {
        let user_id = user
            .id
            .ok_or_else(|| SyncError::data_shape("user record has no id"))?;
        let now = Utc::now();

        if let Some(limits) = self.limits_cache.load_fresh(user_id, now) {
            debug!(%user_id, "Using cached account limits");
            return Ok(limits);
        }

        let service_level = user.service_level.unwrap_or(ServiceLevel::Basic);
        let limits = caller
            .call(&Scope::UserOwn, "getAccountLimits", |token| {
                let store = self.user_store.clone();
                async move { store.get_account_limits(service_level, &token).await }
            })
            .await?;

        if let Err(err) = self.limits_cache.store(user_id, &limits, now) {
            warn!(%user_id, %err, "Failed to persist account limits cache");
        }
        Ok(limits)
    }

    /// Pipeline + expunge for one scope's downloaded chunks.
    #[allow(clippy::too_many_arguments)]
    async fn process_scope(
        &self,
        caller: &RemoteCaller,
        scope: &Scope,
        linked_notebook: Option<&LinkedNotebook>,
        shard_id: Option<ShardId>,
        mode: SyncMode,
        downloaded: &DownloadedChunks,
        caches: &mut CacheRegistry,
        repeat_full_sync: bool,
    ) -> Result<(), SyncError> {
        let contents = ChunkContents::collect(&downloaded.chunks);
        let observed = ObservedGuids::from_contents(&contents);

        let mut fetcher = self
            .make_fetcher(caller, scope, linked_notebook, shard_id)
            .await?;
        let pipeline = ScopePipeline::new(
            scope.clone(),
            mode,
            self.local_store.clone(),
            self.emitter.clone(),
        );
        let mut counters = pipeline.run(&contents, caches, &mut fetcher).await?;

        expunge::apply_chunk_expunges(&self.local_store, &contents, scope, &mut counters)
            .await?;
        self.emitter.emit(SyncEvent::ExpungedFromServerToClient);

        if matches!(mode, SyncMode::Full) && repeat_full_sync {
            expunge::expunge_stale_items(&self.local_store, scope, &observed).await?;
        }

        Ok(())
    }

    async fn sync_linked_notebooks(
        &self,
        caller: &RemoteCaller,
        params: &LastSyncParameters,
        summary: &mut SyncSummary,
        caches: &mut CacheRegistry,
    ) -> Result<(), SyncError> {
        let linked_notebooks = self.local_store.list_linked_notebooks().await?;
        if linked_notebooks.is_empty() {
            return Ok(());
        }

        info!(count = linked_notebooks.len(), "Synchronizing linked notebooks");
        self.auth.register_linked_notebooks(&linked_notebooks).await;
        self.auth
            .refresh_expiring_linked_tokens(&self.emitter)
            .await?;

        for linked_notebook in &linked_notebooks {
            if self.cancel.is_cancelled() {
                return Err(SyncError::Stopped);
            }

            let guid = linked_notebook.guid.clone().ok_or_else(|| {
                SyncError::data_shape("linked notebook in the local store has no guid")
            })?;
            let scope = Scope::LinkedNotebook(guid.clone());
            let prior = params.linked_notebook(&guid);
            summary.linked_notebooks.insert(guid.clone(), prior);

            let mut mode = SyncMode::from_after_usn(prior.last_update_count);
            let mut after = prior.last_update_count;

            if prior.last_update_count > 0 {
                let state = caller
                    .call(&scope, "getLinkedNotebookSyncState", |token| {
                        let store = self.note_store.clone();
                        let ln = linked_notebook.clone();
                        async move { store.get_linked_notebook_sync_state(&ln, &token).await }
                    })
                    .await?;

                if state.full_sync_before > prior.last_sync_time {
                    info!(%guid, "Server requires a new full sync of this linked notebook");
                    mode = SyncMode::Full;
                    after = 0;
                } else if state.update_count == prior.last_update_count {
                    debug!(%guid, "Linked notebook is up to date, skipping");
                    continue;
                }
            }

            let downloaded = chunks::download_chunks(
                caller,
                self.note_store.clone(),
                &scope,
                Some(linked_notebook),
                mode,
                after,
                prior.last_update_count,
                prior.last_sync_time,
                &self.emitter,
            )
            .await?;

            self.process_scope(
                caller,
                &scope,
                Some(linked_notebook),
                linked_notebook.shard_id.clone(),
                mode,
                &downloaded,
                caches,
                // A non-zero prior sync time marks a linked notebook that
                // completed a full sync before
                prior.last_sync_time > 0,
            )
            .await?;

            summary.linked_notebooks.insert(
                guid,
                LinkedNotebookSyncParams {
                    last_update_count: downloaded.last_update_count,
                    last_sync_time: downloaded.last_sync_time,
                },
            );
        }

        // Tags from linked notebooks that no note references anymore
        self.local_store
            .expunge_noteless_linked_notebook_tags()
            .await?;

        Ok(())
    }

    /// Builds the per-scope content fetcher with its (optional) auxiliary
    /// downloaders.
    async fn make_fetcher(
        &self,
        caller: &RemoteCaller,
        scope: &Scope,
        _linked_notebook: Option<&LinkedNotebook>,
        shard_id: Option<ShardId>,
    ) -> Result<FullContentFetcher, SyncError> {
        let mut thumbnail_downloader = None;
        let mut ink_image_downloader = None;

        let wants_aux =
            self.options.download_note_thumbnails || self.options.download_ink_note_images;
        if wants_aux {
            match shard_id {
                Some(shard) => {
                    let token = self.auth.token_for(scope).await?;
                    if self.options.download_note_thumbnails {
                        match ThumbnailDownloader::new(&self.host, shard.clone(), token.clone()) {
                            Ok(dl) => thumbnail_downloader = Some(dl),
                            Err(err) => {
                                warn!(%err, "Cannot build thumbnail downloader, thumbnails disabled for this scope")
                            }
                        }
                    }
                    if self.options.download_ink_note_images {
                        match InkNoteImageDownloader::new(
                            &self.host,
                            shard,
                            token,
                            self.options.ink_note_images_dir(),
                        ) {
                            Ok(dl) => ink_image_downloader = Some(dl),
                            Err(err) => {
                                warn!(%err, "Cannot build ink image downloader, ink images disabled for this scope")
                            }
                        }
                    }
                }
                None => {
                    warn!(%scope, "No shard id known, auxiliary downloads disabled for this scope");
                }
            }
        }

        Ok(FullContentFetcher::new(
            scope.clone(),
            caller.clone(),
            self.note_store.clone(),
            self.local_store.clone(),
            self.emitter.clone(),
            self.options.clone(),
            thumbnail_downloader,
            ink_image_downloader,
            self.pending_usns.clone(),
        ))
    }
}
