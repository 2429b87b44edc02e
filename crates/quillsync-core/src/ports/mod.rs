//! Port definitions (trait interfaces for adapters)

pub mod auth_broker;
pub mod local_store;
pub mod remote_api;

pub use auth_broker::{AuthData, IAuthTokenBroker};
pub use local_store::ILocalStore;
pub use remote_api::{
    INoteStore, IUserStore, NoteFetchOptions, RemoteError, RemoteResult, ResourceFetchOptions,
};
