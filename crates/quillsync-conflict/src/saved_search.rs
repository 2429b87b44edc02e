//! Saved search conflict resolution
//!
//! Thin front over the shared container resolver. Saved searches exist
//! only in the user's own scope, which the container trait's listing
//! already accounts for; nothing else is kind-specific here.

use std::sync::Arc;

use quillsync_core::domain::SavedSearch;
use quillsync_core::ports::ILocalStore;

use crate::caches::SavedSearchSyncCache;
use crate::container::ContainerResolver;
use crate::error::ConflictError;
use crate::ContainerResolution;

/// One-shot resolver for saved-search conflicts
pub struct SavedSearchConflictResolver {
    inner: ContainerResolver,
}

impl SavedSearchConflictResolver {
    pub fn new(local_store: Arc<dyn ILocalStore>) -> Self {
        Self {
            inner: ContainerResolver::new(local_store),
        }
    }

    pub async fn resolve_by_guid(
        &self,
        remote: SavedSearch,
        local: SavedSearch,
        cache: &mut SavedSearchSyncCache,
    ) -> Result<ContainerResolution<SavedSearch>, ConflictError> {
        self.inner.resolve_by_guid(remote, local, cache).await
    }

    pub async fn resolve_by_name(
        &self,
        remote: SavedSearch,
        local: SavedSearch,
        cache: &mut SavedSearchSyncCache,
    ) -> Result<ContainerResolution<SavedSearch>, ConflictError> {
        self.inner.resolve_by_name(remote, local, cache).await
    }
}
