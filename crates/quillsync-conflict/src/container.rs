//! Shared conflict resolution for named containers
//!
//! Notebooks, tags and saved searches follow one merge protocol:
//!
//! - A by-guid match whose local USN is already at or past the remote
//!   USN keeps the local copy untouched.
//! - Otherwise the remote copy wins and lands under the existing local
//!   id; any *other* local container occupying the remote's name in the
//!   same scope is first renamed with the conflict suffix (the service
//!   enforces per-scope name uniqueness, so the collision cannot stand).
//! - A by-name match with a never-synced clean local container adopts
//!   the remote into that local id; a dirty or differently-guided local
//!   container is renamed aside and the remote becomes a new item.
//!
//! [`ContainerResolver`] implements the protocol once, generically; the
//! per-entity resolver types in [`crate::notebook`], [`crate::tag`] and
//! [`crate::saved_search`] are thin fronts over it. Entity-specific
//! behavior hooks in through [`NamedContainer`]: the accessor surface,
//! the scope listing behind the caches, the persistence call for
//! renames, and a post-merge fixup (tags re-resolve their parent's
//! local id there).

use std::sync::Arc;

use quillsync_core::domain::{Guid, LocalId, Notebook, SavedSearch, Scope, Tag, Usn};
use quillsync_core::ports::ILocalStore;
use tracing::{debug, info};

use crate::caches::ContainerSyncCache;
use crate::error::ConflictError;
use crate::namer::ConflictNamer;
use crate::ContainerResolution;

/// Accessor surface of a named, scoped, USN-stamped container.
#[async_trait::async_trait]
pub trait NamedContainer: Clone + Send + Sync {
    /// Entity kind for log and error messages
    const KIND: &'static str;

    fn guid(&self) -> Option<&Guid>;
    fn local_id(&self) -> LocalId;
    fn set_local_id(&mut self, local_id: LocalId);
    fn name(&self) -> Option<&str>;
    fn set_name(&mut self, name: String);
    fn usn(&self) -> Option<Usn>;
    fn locally_modified(&self) -> bool;
    fn set_locally_modified(&mut self, locally_modified: bool);
    fn set_local_only(&mut self, local_only: bool);

    /// Scope-wide listing the sync caches fill from
    async fn list(local_store: &dyn ILocalStore, scope: &Scope) -> anyhow::Result<Vec<Self>>;

    /// Persists an updated copy of this container
    async fn persist_update(&self, local_store: &dyn ILocalStore) -> anyhow::Result<()>;

    /// Entity-specific fixup after the remote copy takes over the local
    /// identity
    fn after_merge(&mut self, _cache: &ContainerSyncCache<Self>) {}
}

// ============================================================================
// NamedContainer implementations
// ============================================================================

#[async_trait::async_trait]
impl NamedContainer for Notebook {
    const KIND: &'static str = "notebook";

    fn guid(&self) -> Option<&Guid> {
        self.guid.as_ref()
    }

    fn local_id(&self) -> LocalId {
        self.local_id
    }

    fn set_local_id(&mut self, local_id: LocalId) {
        self.local_id = local_id;
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    fn usn(&self) -> Option<Usn> {
        self.update_sequence_num
    }

    fn locally_modified(&self) -> bool {
        self.locally_modified
    }

    fn set_locally_modified(&mut self, locally_modified: bool) {
        self.locally_modified = locally_modified;
    }

    fn set_local_only(&mut self, local_only: bool) {
        self.local_only = local_only;
    }

    async fn list(local_store: &dyn ILocalStore, scope: &Scope) -> anyhow::Result<Vec<Self>> {
        local_store.list_notebooks(scope).await
    }

    async fn persist_update(&self, local_store: &dyn ILocalStore) -> anyhow::Result<()> {
        local_store.update_notebook(self).await
    }
}

#[async_trait::async_trait]
impl NamedContainer for Tag {
    const KIND: &'static str = "tag";

    fn guid(&self) -> Option<&Guid> {
        self.guid.as_ref()
    }

    fn local_id(&self) -> LocalId {
        self.local_id
    }

    fn set_local_id(&mut self, local_id: LocalId) {
        self.local_id = local_id;
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    fn usn(&self) -> Option<Usn> {
        self.update_sequence_num
    }

    fn locally_modified(&self) -> bool {
        self.locally_modified
    }

    fn set_locally_modified(&mut self, locally_modified: bool) {
        self.locally_modified = locally_modified;
    }

    fn set_local_only(&mut self, local_only: bool) {
        self.local_only = local_only;
    }

    async fn list(local_store: &dyn ILocalStore, scope: &Scope) -> anyhow::Result<Vec<Self>> {
        local_store.list_tags(scope).await
    }

    async fn persist_update(&self, local_store: &dyn ILocalStore) -> anyhow::Result<()> {
        local_store.update_tag(self).await
    }

    /// A merged tag keeps the remote's parent guid; the parent's local
    /// id comes from the scope cache when the parent is known locally.
    fn after_merge(&mut self, cache: &ContainerSyncCache<Self>) {
        self.parent_local_id = self
            .parent_guid
            .as_ref()
            .and_then(|guid| cache.get_by_guid(guid).map(|parent| parent.local_id));
    }
}

#[async_trait::async_trait]
impl NamedContainer for SavedSearch {
    const KIND: &'static str = "saved search";

    fn guid(&self) -> Option<&Guid> {
        self.guid.as_ref()
    }

    fn local_id(&self) -> LocalId {
        self.local_id
    }

    fn set_local_id(&mut self, local_id: LocalId) {
        self.local_id = local_id;
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    fn usn(&self) -> Option<Usn> {
        self.update_sequence_num
    }

    fn locally_modified(&self) -> bool {
        self.locally_modified
    }

    fn set_locally_modified(&mut self, locally_modified: bool) {
        self.locally_modified = locally_modified;
    }

    fn set_local_only(&mut self, local_only: bool) {
        self.local_only = local_only;
    }

    async fn list(local_store: &dyn ILocalStore, scope: &Scope) -> anyhow::Result<Vec<Self>> {
        // Saved searches exist only in the user's own scope
        if scope.is_user_own() {
            local_store.list_saved_searches().await
        } else {
            Ok(Vec::new())
        }
    }

    async fn persist_update(&self, local_store: &dyn ILocalStore) -> anyhow::Result<()> {
        local_store.update_saved_search(self).await
    }
}

// ============================================================================
// ContainerResolver
// ============================================================================

/// The shared merge protocol, generic over the container kind.
pub(crate) struct ContainerResolver {
    local_store: Arc<dyn ILocalStore>,
}

impl ContainerResolver {
    pub(crate) fn new(local_store: Arc<dyn ILocalStore>) -> Self {
        Self { local_store }
    }

    /// Resolves a conflict where `local` was found by the remote's guid.
    pub(crate) async fn resolve_by_guid<E: NamedContainer>(
        &self,
        remote: E,
        local: E,
        cache: &mut ContainerSyncCache<E>,
    ) -> Result<ContainerResolution<E>, ConflictError> {
        let remote_name = require_name(&remote)?;
        let remote_usn = remote.usn().ok_or_else(|| {
            ConflictError::MalformedRemote(format!("{} from sync chunk has no USN", E::KIND))
        })?;

        if let Some(local_usn) = local.usn() {
            if local_usn >= remote_usn {
                debug!(
                    kind = E::KIND,
                    guid = ?local.guid(),
                    local_usn,
                    remote_usn,
                    "Local copy is current, keeping it"
                );
                return Ok(ContainerResolution::KeepLocal);
            }
        }

        if cache.name_taken_by_other(&remote_name, &local.local_id()) {
            let squatter = cache
                .get_by_name(&remote_name)
                .cloned()
                .expect("name_taken_by_other implies presence");
            self.rename_aside(squatter, cache).await?;
        }

        let merged = merge_remote(remote, &local, cache);
        cache.remove(&local);
        cache.put(merged.clone());
        Ok(ContainerResolution::TakeRemote { merged })
    }

    /// Resolves a conflict where `local` was found by the remote's name
    /// within the same scope (no local item carries the remote's guid).
    pub(crate) async fn resolve_by_name<E: NamedContainer>(
        &self,
        remote: E,
        local: E,
        cache: &mut ContainerSyncCache<E>,
    ) -> Result<ContainerResolution<E>, ConflictError> {
        let remote_name = require_name(&remote)?;

        if local.guid().is_none() && !local.locally_modified() {
            // A never-synced, untouched local container with the same
            // name: the remote copy is its server-side identity.
            info!(
                kind = E::KIND,
                name = %remote_name,
                "Adopting remote copy into never-synced local one"
            );
            let merged = merge_remote(remote, &local, cache);
            cache.remove(&local);
            cache.put(merged.clone());
            return Ok(ContainerResolution::TakeRemote { merged });
        }

        // Dirty local copy, or a different remote container renamed onto
        // this name: move the local copy aside, remote arrives as a new
        // item under its own fresh local id.
        let renamed = self.rename_aside(local, cache).await?;
        debug!(
            kind = E::KIND,
            name = %remote_name,
            renamed_to = ?renamed.name(),
            "Local copy renamed aside for incoming remote"
        );

        let mut merged = remote;
        merged.set_locally_modified(false);
        merged.set_local_only(false);
        merged.after_merge(cache);
        cache.put(merged.clone());
        Ok(ContainerResolution::TakeRemote { merged })
    }

    /// Gives `container` a conflict name and persists the rename. The
    /// renamed copy stays dirty: the rename is a local divergence the
    /// caller may later push.
    async fn rename_aside<E: NamedContainer>(
        &self,
        mut container: E,
        cache: &mut ContainerSyncCache<E>,
    ) -> Result<E, ConflictError> {
        let original = container.name().unwrap_or_default().to_string();
        let new_name = ConflictNamer::generate_unique(&original, |candidate| {
            cache.get_by_name(candidate).is_some()
        });

        cache.remove(&container);
        container.set_name(new_name);
        container.set_locally_modified(true);
        container.persist_update(self.local_store.as_ref()).await?;
        cache.put(container.clone());
        Ok(container)
    }
}

fn require_name<E: NamedContainer>(remote: &E) -> Result<String, ConflictError> {
    remote.name().map(str::to_string).ok_or_else(|| {
        ConflictError::MalformedRemote(format!("{} from sync chunk has no name", E::KIND))
    })
}

/// Builds the merged container: the remote copy carrying the surviving
/// local id, with local-change flags cleared (remote-origin writes always
/// clear them).
fn merge_remote<E: NamedContainer>(
    mut remote: E,
    local: &E,
    cache: &ContainerSyncCache<E>,
) -> E {
    remote.set_local_id(local.local_id());
    remote.set_locally_modified(false);
    remote.set_local_only(false);
    remote.after_merge(cache);
    remote
}
