//! Configuration for the synchronization engine
//!
//! Two pieces of persisted configuration live here: the sync options the
//! caller toggles (thumbnail and ink-note-image downloads plus the ink
//! image storage directory) and the per-user-id account-limits cache with
//! its 30-day expiry.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{AccountLimits, UserId};

/// Days a cached account-limits record stays fresh
pub const ACCOUNT_LIMITS_CACHE_DAYS: i64 = 30;

// ============================================================================
// Sync options
// ============================================================================

/// Caller-facing sync options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Download note thumbnails after full note content (default off)
    pub download_note_thumbnails: bool,
    /// Download rendered images for ink notes (default off)
    pub download_ink_note_images: bool,
    /// Directory for ink-note images; when unset, unusable or not a
    /// writable directory, the OS-specific default applies
    pub ink_note_images_storage_path: Option<PathBuf>,
}

impl SyncOptions {
    /// Resolves the effective ink-note image directory.
    ///
    /// The configured path wins when it is an existing writable directory
    /// or can be created; otherwise falls back to the app-persistent-data
    /// default.
    pub fn ink_note_images_dir(&self) -> PathBuf {
        if let Some(path) = &self.ink_note_images_storage_path {
            if dir_is_usable(path) {
                return path.clone();
            }
            warn!(
                path = %path.display(),
                "Configured ink note image directory is not usable, falling back to default"
            );
        }
        default_ink_note_images_dir()
    }
}

/// OS-specific default directory for ink-note images
pub fn default_ink_note_images_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quillsync")
        .join("inkNoteImages")
}

/// Returns true if `path` is (or can become) a writable directory
fn dir_is_usable(path: &Path) -> bool {
    if !path.exists() {
        return std::fs::create_dir_all(path).is_ok();
    }
    if !path.is_dir() {
        return false;
    }
    // Probe writability by touching a temporary file
    let probe = path.join(".quillsync-write-probe");
    match std::fs::File::create(&probe) {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

// ============================================================================
// Account limits cache
// ============================================================================

/// One cached account-limits record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAccountLimits {
    pub user_id: UserId,
    pub limits: AccountLimits,
    /// When the limits were fetched from the service
    pub fetched_at: DateTime<Utc>,
}

impl CachedAccountLimits {
    /// Returns true if the record is strictly older than the cache TTL
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at > Duration::days(ACCOUNT_LIMITS_CACHE_DAYS)
    }
}

/// File-backed cache of account limits, one JSON file per user id.
///
/// The engine refetches limits from the service only when the cached
/// record is strictly older than [`ACCOUNT_LIMITS_CACHE_DAYS`].
#[derive(Debug, Clone)]
pub struct AccountLimitsCache {
    dir: PathBuf,
}

impl AccountLimitsCache {
    /// Creates a cache rooted at `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform-appropriate default cache directory
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quillsync")
            .join("account-limits")
    }

    fn file_for(&self, user_id: UserId) -> PathBuf {
        self.dir.join(format!("{}.json", user_id))
    }

    /// Loads the cached record for `user_id`, if any. A corrupt file is
    /// treated as a cache miss.
    pub fn load(&self, user_id: UserId) -> Option<CachedAccountLimits> {
        let path = self.file_for(user_id);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(cached) => Some(cached),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    %err,
                    "Discarding unreadable account limits cache entry"
                );
                None
            }
        }
    }

    /// Loads the record for `user_id` only if it is still fresh at `now`
    pub fn load_fresh(&self, user_id: UserId, now: DateTime<Utc>) -> Option<AccountLimits> {
        let cached = self.load(user_id)?;
        if cached.is_stale(now) {
            None
        } else {
            Some(cached.limits)
        }
    }

    /// Persists freshly fetched limits for `user_id`
    pub fn store(
        &self,
        user_id: UserId,
        limits: &AccountLimits,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let record = CachedAccountLimits {
            user_id,
            limits: limits.clone(),
            fetched_at: now,
        };
        let json = serde_json::to_string_pretty(&record)?;
        std::fs::write(self.file_for(user_id), json)?;
        Ok(())
    }
}
