//! Tag conflict resolution
//!
//! Thin front over the shared container resolver; on top of the common
//! protocol, a merged tag re-resolves its parent's local id through the
//! scope cache (see `Tag::after_merge` in [`crate::container`]).

use std::sync::Arc;

use quillsync_core::domain::Tag;
use quillsync_core::ports::ILocalStore;

use crate::caches::TagSyncCache;
use crate::container::ContainerResolver;
use crate::error::ConflictError;
use crate::ContainerResolution;

/// One-shot resolver for tag conflicts
pub struct TagConflictResolver {
    inner: ContainerResolver,
}

impl TagConflictResolver {
    pub fn new(local_store: Arc<dyn ILocalStore>) -> Self {
        Self {
            inner: ContainerResolver::new(local_store),
        }
    }

    pub async fn resolve_by_guid(
        &self,
        remote: Tag,
        local: Tag,
        cache: &mut TagSyncCache,
    ) -> Result<ContainerResolution<Tag>, ConflictError> {
        self.inner.resolve_by_guid(remote, local, cache).await
    }

    pub async fn resolve_by_name(
        &self,
        remote: Tag,
        local: Tag,
        cache: &mut TagSyncCache,
    ) -> Result<ContainerResolution<Tag>, ConflictError> {
        self.inner.resolve_by_name(remote, local, cache).await
    }
}
