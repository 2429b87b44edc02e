//! User account and account limits

use serde::{Deserialize, Serialize};

use super::newtypes::{ShardId, Timestamp, UserId};

/// Service subscription level of an account.
///
/// Determines which set of account limits applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLevel {
    #[default]
    Basic,
    Plus,
    Premium,
    Business,
}

/// The authenticated user's account as the service reports it.
///
/// Fetched once per sync session and written into the local store so the
/// client can show account details offline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Numeric account id, absent only in malformed service responses
    pub id: Option<UserId>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub service_level: Option<ServiceLevel>,
    /// Shard hosting this account's data
    pub shard_id: Option<ShardId>,
    pub created: Option<Timestamp>,
    pub updated: Option<Timestamp>,
    /// Set when the account has been deactivated on the service
    pub deleted: Option<Timestamp>,
    /// Account limits embedded in some service responses
    pub account_limits: Option<AccountLimits>,
}

/// Per-service-level quotas.
///
/// All fields optional; the service omits limits that do not apply to the
/// account's level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLimits {
    /// Bytes the account may upload per cycle
    pub upload_limit: Option<i64>,
    pub note_size_max: Option<i64>,
    pub resource_size_max: Option<i64>,
    pub user_note_count_max: Option<i32>,
    pub user_notebook_count_max: Option<i32>,
    pub user_tag_count_max: Option<i32>,
    pub note_tag_count_max: Option<i32>,
    pub user_saved_search_count_max: Option<i32>,
    pub user_linked_notebook_max: Option<i32>,
    pub note_resource_count_max: Option<i32>,
}
