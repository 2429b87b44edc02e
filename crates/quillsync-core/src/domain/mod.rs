//! Domain entities and value types
//!
//! Entities are plain serde-able records with public fields; they cross
//! port boundaries constantly (remote gateway, local store, resolvers)
//! and behave as wire/store records rather than encapsulated aggregates.
//! Invariants that need enforcement live in the newtypes
//! ([`newtypes::Guid`], [`newtypes::LocalId`]) and in the engine.

pub mod errors;
pub mod linked_notebook;
pub mod newtypes;
pub mod note;
pub mod notebook;
pub mod resource;
pub mod saved_search;
pub mod sync_chunk;
pub mod tag;
pub mod user;

pub use errors::{DomainError, ErrorString};
pub use linked_notebook::LinkedNotebook;
pub use newtypes::{AuthToken, Guid, LocalId, Scope, ShardId, Timestamp, UserId, Usn};
pub use note::{Note, NoteAttributes, NoteSummary};
pub use notebook::{Notebook, NotebookRestrictions};
pub use resource::{Resource, ResourceData, INK_NOTE_MIME};
pub use saved_search::SavedSearch;
pub use sync_chunk::{SyncChunk, SyncChunkFilter, SyncState};
pub use tag::Tag;
pub use user::{AccountLimits, ServiceLevel, User};
