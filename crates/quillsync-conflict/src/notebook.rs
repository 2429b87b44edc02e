//! Notebook conflict resolution
//!
//! Thin front over the shared container resolver; the merge protocol
//! lives in [`crate::container`].

use std::sync::Arc;

use quillsync_core::domain::Notebook;
use quillsync_core::ports::ILocalStore;

use crate::caches::NotebookSyncCache;
use crate::container::ContainerResolver;
use crate::error::ConflictError;
use crate::ContainerResolution;

/// One-shot resolver for notebook conflicts
pub struct NotebookConflictResolver {
    inner: ContainerResolver,
}

impl NotebookConflictResolver {
    pub fn new(local_store: Arc<dyn ILocalStore>) -> Self {
        Self {
            inner: ContainerResolver::new(local_store),
        }
    }

    /// Resolves a conflict where `local` was found by the remote's guid.
    pub async fn resolve_by_guid(
        &self,
        remote: Notebook,
        local: Notebook,
        cache: &mut NotebookSyncCache,
    ) -> Result<ContainerResolution<Notebook>, ConflictError> {
        self.inner.resolve_by_guid(remote, local, cache).await
    }

    /// Resolves a conflict where `local` was found by the remote's name
    /// within the same scope (no local item carries the remote's guid).
    pub async fn resolve_by_name(
        &self,
        remote: Notebook,
        local: Notebook,
        cache: &mut NotebookSyncCache,
    ) -> Result<ContainerResolution<Notebook>, ConflictError> {
        self.inner.resolve_by_name(remote, local, cache).await
    }
}
