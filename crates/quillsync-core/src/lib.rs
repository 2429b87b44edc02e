//! Quillsync Core - Domain types and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Note`, `Notebook`, `Tag`, `SavedSearch`,
//!   `Resource`, `LinkedNotebook`, `User`, `SyncChunk`, `SyncState`
//! - **Port definitions** - Traits the engine consumes:
//!   `IUserStore`, `INoteStore`, `ILocalStore`, `IAuthTokenBroker`
//! - **Configuration** - Sync options and the persisted account-limits cache
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure data types with no I/O dependencies.
//! Ports define trait interfaces that adapter crates (and test doubles)
//! implement. The synchronization engine in `quillsync-sync` orchestrates
//! domain entities exclusively through these port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
