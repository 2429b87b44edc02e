//! Downloader errors

use thiserror::Error;

/// Errors raised by the auxiliary downloaders
#[derive(Debug, Error)]
pub enum DownloadError {
    /// A required input (host, guid, shard id) was empty
    #[error("invalid download request: {0}")]
    InvalidInput(String),

    /// The HTTP request failed or returned a non-success status
    #[error("download request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an empty body
    #[error("received empty {0} data")]
    EmptyBody(&'static str),

    /// The storage directory is unusable or the file write failed
    #[error("cannot store downloaded data: {0}")]
    Storage(String),
}
