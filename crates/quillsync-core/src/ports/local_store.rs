//! Local store port (driven/secondary port)
//!
//! Interface to the client's persistent local store. The engine issues
//! find/add/update/expunge requests per entity kind; the storage layout
//! behind them is an adapter concern (`quillsync-store` ships a SQLite
//! implementation).
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   and don't need domain-level classification; any storage error fails
//!   the sync session.
//! - Name lookups are scoped: two notebooks may share a name as long as
//!   they live in different linked-notebook scopes.
//! - Implementations serialize writes per entity kind; each individual
//!   operation is atomic.

use crate::domain::{
    Guid, LinkedNotebook, Note, NoteSummary, Notebook, Resource, SavedSearch, Scope, Tag, User,
};

/// Port trait for the persistent local store.
#[async_trait::async_trait]
pub trait ILocalStore: Send + Sync {
    // --- User ---

    /// Inserts or replaces the account record
    async fn put_user(&self, user: &User) -> anyhow::Result<()>;

    // --- Notebooks ---

    async fn find_notebook_by_guid(&self, guid: &Guid) -> anyhow::Result<Option<Notebook>>;

    /// Finds a notebook by name within one scope. Name comparison is
    /// case-insensitive, matching the service's uniqueness rule.
    async fn find_notebook_by_name(
        &self,
        name: &str,
        scope: &Scope,
    ) -> anyhow::Result<Option<Notebook>>;

    async fn add_notebook(&self, notebook: &Notebook) -> anyhow::Result<()>;
    async fn update_notebook(&self, notebook: &Notebook) -> anyhow::Result<()>;

    /// Removes the notebook and everything it contains
    async fn expunge_notebook(&self, guid: &Guid) -> anyhow::Result<()>;

    async fn list_notebooks(&self, scope: &Scope) -> anyhow::Result<Vec<Notebook>>;

    // --- Tags ---

    async fn find_tag_by_guid(&self, guid: &Guid) -> anyhow::Result<Option<Tag>>;
    async fn find_tag_by_name(&self, name: &str, scope: &Scope) -> anyhow::Result<Option<Tag>>;
    async fn add_tag(&self, tag: &Tag) -> anyhow::Result<()>;
    async fn update_tag(&self, tag: &Tag) -> anyhow::Result<()>;

    /// Removes the tag and its child subtree
    async fn expunge_tag(&self, guid: &Guid) -> anyhow::Result<()>;

    async fn list_tags(&self, scope: &Scope) -> anyhow::Result<Vec<Tag>>;

    /// Removes tags that belong to a linked notebook and are no longer
    /// referenced by any note
    async fn expunge_noteless_linked_notebook_tags(&self) -> anyhow::Result<()>;

    // --- Saved searches (user's own scope only) ---

    async fn find_saved_search_by_guid(&self, guid: &Guid)
        -> anyhow::Result<Option<SavedSearch>>;
    async fn find_saved_search_by_name(&self, name: &str)
        -> anyhow::Result<Option<SavedSearch>>;
    async fn add_saved_search(&self, search: &SavedSearch) -> anyhow::Result<()>;
    async fn update_saved_search(&self, search: &SavedSearch) -> anyhow::Result<()>;
    async fn expunge_saved_search(&self, guid: &Guid) -> anyhow::Result<()>;
    async fn list_saved_searches(&self) -> anyhow::Result<Vec<SavedSearch>>;

    // --- Notes ---

    async fn find_note_by_guid(&self, guid: &Guid) -> anyhow::Result<Option<Note>>;
    async fn add_note(&self, note: &Note) -> anyhow::Result<()>;
    async fn update_note(&self, note: &Note) -> anyhow::Result<()>;

    /// Removes the note and its resources
    async fn expunge_note(&self, guid: &Guid) -> anyhow::Result<()>;

    /// Lists per-note summaries for a scope without loading bodies
    async fn list_note_summaries(&self, scope: &Scope) -> anyhow::Result<Vec<NoteSummary>>;

    // --- Resources ---

    async fn find_resource_by_guid(&self, guid: &Guid) -> anyhow::Result<Option<Resource>>;
    async fn add_resource(&self, resource: &Resource) -> anyhow::Result<()>;
    async fn update_resource(&self, resource: &Resource) -> anyhow::Result<()>;

    // --- Linked notebooks ---

    async fn find_linked_notebook_by_guid(
        &self,
        guid: &Guid,
    ) -> anyhow::Result<Option<LinkedNotebook>>;
    async fn add_linked_notebook(&self, linked_notebook: &LinkedNotebook) -> anyhow::Result<()>;
    async fn update_linked_notebook(
        &self,
        linked_notebook: &LinkedNotebook,
    ) -> anyhow::Result<()>;

    /// Removes the linked notebook reference and all content that arrived
    /// through it
    async fn expunge_linked_notebook(&self, guid: &Guid) -> anyhow::Result<()>;

    async fn list_linked_notebooks(&self) -> anyhow::Result<Vec<LinkedNotebook>>;
}
