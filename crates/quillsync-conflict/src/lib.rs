//! Conflict resolution for remote-to-local synchronization
//!
//! When a sync chunk carries an entity that already exists locally (found
//! by guid, or by name within the same scope), a resolver decides the
//! merge outcome:
//!
//! - **Take remote** - the remote copy wins; the local id is preserved
//! - **Keep local** - the local copy is current; nothing is written
//! - **Rename local, take remote** - a dirty or colliding local copy is
//!   renamed with a conflict suffix so the remote copy can land
//! - **Conflict note copy** - a dirty local note is forked into a new
//!   local-only-id note marked with `conflict_source_note_guid` before the
//!   remote version overwrites the original
//!
//! Resolvers are one-shot: each call resolves exactly one conflict,
//! performs its own follow-up local-store writes, and returns the entity
//! the pipeline should continue with. A resolver error aborts the sync
//! session.

pub mod caches;
pub mod container;
pub mod error;
pub mod linked_notebook;
pub mod namer;
pub mod note;
pub mod notebook;
pub mod saved_search;
pub mod tag;


pub use caches::{
    CacheRegistry, ContainerSyncCache, NotebookSyncCache, SavedSearchSyncCache, SyncCacheSet,
    TagSyncCache,
};
pub use container::NamedContainer;
pub use error::ConflictError;
pub use linked_notebook::LinkedNotebookConflictResolver;
pub use namer::{ConflictNamer, CONFLICT_SUFFIX};
pub use note::{NoteConflictResolver, NoteResolution};
pub use notebook::NotebookConflictResolver;
pub use saved_search::SavedSearchConflictResolver;
pub use tag::TagConflictResolver;

/// Outcome of resolving one named-container conflict.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerResolution<E> {
    /// Write the remote copy (local id preserved inside `merged`)
    TakeRemote {
        /// The remote entity carrying the surviving local id
        merged: E,
    },
    /// The local copy is current; no write needed
    KeepLocal,
}
