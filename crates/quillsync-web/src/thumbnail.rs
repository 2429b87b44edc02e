//! Note thumbnail downloader
//!
//! Fetches thumbnail bytes for a note from the service's shard endpoint:
//! `POST {base}/shard/{shard_id}/thm/note/{note_guid}` with the auth token
//! as a form field. Public shares use an empty token and a plain GET.

use quillsync_core::domain::{AuthToken, Guid, ShardId};
use tracing::debug;

use crate::error::DownloadError;

/// Downloads note thumbnails from one shard.
///
/// One downloader instance serves one (host, shard, token) combination;
/// the engine builds them per scope.
#[derive(Debug, Clone)]
pub struct ThumbnailDownloader {
    client: reqwest::Client,
    base_url: String,
    shard_id: ShardId,
    auth_token: AuthToken,
}

impl ThumbnailDownloader {
    /// Creates a downloader for the given service host. A bare host gets
    /// the https scheme; a scheme-qualified host is used as-is.
    pub fn new(
        host: &str,
        shard_id: ShardId,
        auth_token: AuthToken,
    ) -> Result<Self, DownloadError> {
        if host.trim().is_empty() {
            return Err(DownloadError::InvalidInput("host is empty".to_string()));
        }
        let base_url = if host.contains("://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{host}")
        };
        Ok(Self::with_base_url(base_url, shard_id, auth_token))
    }

    /// Creates a downloader against an explicit base URL (tests point this
    /// at a mock server)
    pub fn with_base_url(
        base_url: impl Into<String>,
        shard_id: ShardId,
        auth_token: AuthToken,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            shard_id,
            auth_token,
        }
    }

    /// Fetches the thumbnail for `note_guid`.
    ///
    /// # Errors
    ///
    /// Fails on HTTP errors and on an empty response body. Callers treat
    /// any failure as best-effort: the note stays valid without its
    /// thumbnail.
    pub async fn download(&self, note_guid: &Guid) -> Result<Vec<u8>, DownloadError> {
        let url = format!(
            "{}/shard/{}/thm/note/{}",
            self.base_url,
            self.shard_id.as_str(),
            note_guid
        );
        debug!(%url, public = self.auth_token.is_empty(), "Downloading note thumbnail");

        let request = if self.auth_token.is_empty() {
            self.client.get(&url)
        } else {
            self.client
                .post(&url)
                .form(&[("auth", self.auth_token.expose())])
        };

        let bytes = request
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec();

        if bytes.is_empty() {
            return Err(DownloadError::EmptyBody("note thumbnail"));
        }
        Ok(bytes)
    }
}
