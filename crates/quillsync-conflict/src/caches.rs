//! Per-scope container indices
//!
//! Conflict resolution needs synchronous answers to "does any local
//! notebook/tag/saved search in this scope already bear this name?" and
//! "which local item has this guid?". These caches hold those indices in
//! memory, filled lazily from the local store the first time a scope needs
//! them: one cache set for the user's own scope, one per linked notebook.
//!
//! One generic cache serves all three container kinds through the
//! [`NamedContainer`] accessors; name keys are case-folded because the
//! service treats container names as case-insensitively unique within a
//! scope.

use std::collections::HashMap;

use quillsync_core::domain::{Guid, LocalId, Notebook, SavedSearch, Scope, Tag};
use quillsync_core::ports::ILocalStore;
use tracing::debug;

use crate::container::NamedContainer;

/// Normalizes a container name for case-insensitive lookup
fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// In-memory name and guid index over one scope's containers.
#[derive(Debug)]
pub struct ContainerSyncCache<E> {
    by_name: HashMap<String, E>,
    by_guid: HashMap<Guid, E>,
    filled: bool,
}

pub type NotebookSyncCache = ContainerSyncCache<Notebook>;
pub type TagSyncCache = ContainerSyncCache<Tag>;
pub type SavedSearchSyncCache = ContainerSyncCache<SavedSearch>;

impl<E> Default for ContainerSyncCache<E> {
    fn default() -> Self {
        Self {
            by_name: HashMap::new(),
            by_guid: HashMap::new(),
            filled: false,
        }
    }
}

impl<E: NamedContainer> ContainerSyncCache<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once `fill` has completed for this scope
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    /// Loads the scope's containers from the local store. A second call
    /// is a no-op.
    pub async fn fill(
        &mut self,
        local_store: &dyn ILocalStore,
        scope: &Scope,
    ) -> anyhow::Result<()> {
        if self.filled {
            return Ok(());
        }
        for item in E::list(local_store, scope).await? {
            self.put(item);
        }
        self.filled = true;
        debug!(
            %scope,
            kind = E::KIND,
            names = self.by_name.len(),
            "Sync cache filled"
        );
        Ok(())
    }

    /// Inserts or replaces an item in both indices
    pub fn put(&mut self, item: E) {
        if let Some(name) = item.name() {
            self.by_name.insert(name_key(name), item.clone());
        }
        if let Some(guid) = item.guid().cloned() {
            self.by_guid.insert(guid, item);
        }
    }

    /// Drops an item's entries from both indices
    pub fn remove(&mut self, item: &E) {
        if let Some(name) = item.name() {
            self.by_name.remove(&name_key(name));
        }
        if let Some(guid) = item.guid() {
            self.by_guid.remove(guid);
        }
    }

    pub fn get_by_name(&self, name: &str) -> Option<&E> {
        self.by_name.get(&name_key(name))
    }

    pub fn get_by_guid(&self, guid: &Guid) -> Option<&E> {
        self.by_guid.get(guid)
    }

    /// Returns true if some item other than `local_id`'s owner bears the
    /// name
    pub fn name_taken_by_other(&self, name: &str, local_id: &LocalId) -> bool {
        self.get_by_name(name)
            .map(|item| item.local_id() != *local_id)
            .unwrap_or(false)
    }
}

/// The three container caches of one scope.
#[derive(Debug, Default)]
pub struct SyncCacheSet {
    pub notebooks: NotebookSyncCache,
    pub tags: TagSyncCache,
    pub searches: SavedSearchSyncCache,
}

impl SyncCacheSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills all three caches for `scope`
    pub async fn fill(
        &mut self,
        local_store: &dyn ILocalStore,
        scope: &Scope,
    ) -> anyhow::Result<()> {
        self.notebooks.fill(local_store, scope).await?;
        self.tags.fill(local_store, scope).await?;
        self.searches.fill(local_store, scope).await?;
        Ok(())
    }
}

/// All cache sets of a session, keyed by scope.
///
/// One entry exists for the user's own scope plus one per linked-notebook
/// guid, created on demand.
#[derive(Debug, Default)]
pub struct CacheRegistry {
    sets: HashMap<Scope, SyncCacheSet>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the (possibly empty) cache set for `scope`, creating it on
    /// first access
    pub fn entry(&mut self, scope: &Scope) -> &mut SyncCacheSet {
        self.sets.entry(scope.clone()).or_default()
    }

    /// Returns the filled cache set for `scope`, loading it from the
    /// local store when needed
    pub async fn filled(
        &mut self,
        local_store: &dyn ILocalStore,
        scope: &Scope,
    ) -> anyhow::Result<&mut SyncCacheSet> {
        let set = self.sets.entry(scope.clone()).or_default();
        set.fill(local_store, scope).await?;
        Ok(set)
    }
}
