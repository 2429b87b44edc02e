//! Ink note image downloader
//!
//! An ink note's drawing is not stored as a regular resource body; the
//! service renders it to PNG on demand. This downloader fetches the
//! rendered image for one resource
//! (`POST {base}/shard/{shard_id}/res/{resource_guid}.ink` with auth and
//! the requested dimensions) and writes it to
//! `<storage_dir>/<resource_guid>.png`.

use std::path::{Path, PathBuf};

use quillsync_core::domain::{AuthToken, Guid, ShardId};
use tracing::debug;

use crate::error::DownloadError;

/// Downloads rendered ink-note images from one shard.
#[derive(Debug, Clone)]
pub struct InkNoteImageDownloader {
    client: reqwest::Client,
    base_url: String,
    shard_id: ShardId,
    auth_token: AuthToken,
    storage_dir: PathBuf,
}

impl InkNoteImageDownloader {
    /// Creates a downloader for the given service host. A bare host gets
    /// the https scheme; a scheme-qualified host is used as-is.
    pub fn new(
        host: &str,
        shard_id: ShardId,
        auth_token: AuthToken,
        storage_dir: impl Into<PathBuf>,
    ) -> Result<Self, DownloadError> {
        if host.trim().is_empty() {
            return Err(DownloadError::InvalidInput("host is empty".to_string()));
        }
        let base_url = if host.contains("://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{host}")
        };
        Ok(Self::with_base_url(base_url, shard_id, auth_token, storage_dir))
    }

    /// Creates a downloader against an explicit base URL (tests point this
    /// at a mock server)
    pub fn with_base_url(
        base_url: impl Into<String>,
        shard_id: ShardId,
        auth_token: AuthToken,
        storage_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            shard_id,
            auth_token,
            storage_dir: storage_dir.into(),
        }
    }

    /// Fetches the rendered image for `resource_guid` at the given
    /// dimensions and writes it to the storage directory.
    ///
    /// Returns the path of the written PNG.
    pub async fn download(
        &self,
        resource_guid: &Guid,
        width: i16,
        height: i16,
    ) -> Result<PathBuf, DownloadError> {
        let url = format!(
            "{}/shard/{}/res/{}.ink",
            self.base_url,
            self.shard_id.as_str(),
            resource_guid
        );
        debug!(%url, width, height, "Downloading ink note image");

        let bytes = self
            .client
            .post(&url)
            .form(&[
                ("auth", self.auth_token.expose().to_string()),
                ("width", width.to_string()),
                ("height", height.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec();

        if bytes.is_empty() {
            return Err(DownloadError::EmptyBody("ink note image"));
        }

        ensure_storage_dir(&self.storage_dir)?;

        let file_path = self.storage_dir.join(format!("{resource_guid}.png"));
        tokio::fs::write(&file_path, &bytes)
            .await
            .map_err(|e| DownloadError::Storage(format!("{}: {e}", file_path.display())))?;

        debug!(path = %file_path.display(), bytes = bytes.len(), "Ink note image stored");
        Ok(file_path)
    }
}

/// Validates the storage directory: creates it when missing, rejects a
/// same-named file and unwritable directories.
fn ensure_storage_dir(dir: &Path) -> Result<(), DownloadError> {
    if !dir.exists() {
        return std::fs::create_dir_all(dir).map_err(|e| {
            DownloadError::Storage(format!(
                "cannot create ink note image directory {}: {e}",
                dir.display()
            ))
        });
    }
    if !dir.is_dir() {
        return Err(DownloadError::Storage(format!(
            "ink note image path {} exists and is not a directory",
            dir.display()
        )));
    }
    let probe = dir.join(".quillsync-write-probe");
    match std::fs::File::create(&probe) {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
            Ok(())
        }
        Err(e) => Err(DownloadError::Storage(format!(
            "ink note image directory {} is not writable: {e}",
            dir.display()
        ))),
    }
}
