//! End-to-end engine tests against scripted doubles
//!
//! Each module drives a full sync session through `SyncEngine` with a
//! scripted remote service and an in-memory local store.

mod support;

mod test_conflict;
mod test_linked_notebooks;
mod test_stale_expunge;
