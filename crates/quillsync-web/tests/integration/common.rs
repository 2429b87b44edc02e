//! Shared fixtures for downloader integration tests

use quillsync_core::domain::{AuthToken, Guid, ShardId};
use wiremock::MockServer;

pub const SHARD: &str = "s42";
pub const TOKEN: &str = "test-auth-token";

pub async fn mock_server() -> MockServer {
    MockServer::start().await
}

pub fn shard_id() -> ShardId {
    ShardId::new(SHARD).unwrap()
}

pub fn auth_token() -> AuthToken {
    AuthToken::new(TOKEN)
}

pub fn guid(value: &str) -> Guid {
    Guid::new(value).unwrap()
}

/// A minimal valid PNG header, enough to stand in for image bytes
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4]
}
