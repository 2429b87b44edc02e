//! Quillsync Sync - the remote-to-local synchronization engine
//!
//! [`engine::SyncEngine`] mirrors an authoritative remote note service
//! into the local store:
//!
//! 1. **Protocol check** - verify the client's protocol version is still
//!    accepted
//! 2. **User fetch** - account record and (cached) account limits
//! 3. **Sync-state check** - decide between full and incremental sync,
//!    or skip downloading entirely
//! 4. **Chunk download** - pull sync chunks for the user's own scope
//! 5. **Entity pipeline** - reconcile chunk contents against the local
//!    store, dispatching conflicts to per-entity resolvers
//! 6. **Expunge** - apply remote deletions, and after a repeat full sync
//!    sweep out items the server no longer knows
//! 7. **Linked notebooks** - repeat 3-6 per linked-notebook scope under
//!    that scope's own credentials
//! 8. **Finalize** - emit the new sync watermarks
//!
//! All remote calls go through [`backoff::RemoteCaller`], which converts
//! rate-limit responses into scheduled retries and expired-auth responses
//! into token refreshes. Progress and terminal outcomes are emitted as
//! [`events::SyncEvent`]s over an unbounded channel.

pub mod backoff;
pub mod chunks;
pub mod content;
pub mod engine;
pub mod error;
pub mod events;
pub mod expunge;
pub mod pipeline;
pub mod session;

pub use engine::SyncEngine;
pub use error::SyncError;
pub use events::{EventEmitter, ProcessingCounters, SyncEvent};
pub use session::{LastSyncParameters, LinkedNotebookSyncParams, SyncMode, SyncSummary};
