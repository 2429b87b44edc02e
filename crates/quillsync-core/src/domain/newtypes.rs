//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for service identifiers and values. Each newtype
//! ensures validity at construction time, so the rest of the engine can
//! assume a `Guid` is never empty and a `LocalId` is always present.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Epoch-millisecond timestamp as the service reports it.
pub type Timestamp = i64;

/// Update sequence number: per-scope monotonic integer the service stamps
/// on every mutation.
pub type Usn = i32;

// ============================================================================
// Guid
// ============================================================================

/// Server-assigned globally unique identifier for an entity.
///
/// The service uses opaque string guids. A guid is optional on local
/// entities (absent until the first reconciliation with the server), but
/// when present it is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
    /// Maximum guid length the service accepts
    const MAX_LEN: usize = 255;

    /// Creates a guid, validating that it is non-empty and within the
    /// service's length bound.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidGuid("guid is empty".to_string()));
        }
        if value.len() > Self::MAX_LEN {
            return Err(DomainError::InvalidGuid(format!(
                "guid exceeds {} characters",
                Self::MAX_LEN
            )));
        }
        Ok(Self(value))
    }

    /// Returns the guid as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Guid {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// LocalId
// ============================================================================

/// Client-side identifier, always present on every locally stored entity.
///
/// Unlike a [`Guid`], a local id exists from the moment an entity is
/// created, before the server has ever seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(Uuid);

impl LocalId {
    /// Creates a new random local id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a local id from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for LocalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("invalid local id: {e}")))
    }
}

// ============================================================================
// UserId
// ============================================================================

/// Numeric account identifier assigned by the service
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ShardId
// ============================================================================

/// Identifier of the service shard hosting an account's data.
///
/// Required for thumbnail and ink-note-image URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardId(String);

impl ShardId {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidShardId("shard id is empty".to_string()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ShardId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// AuthToken
// ============================================================================

/// Authentication token for the service.
///
/// The token value never appears in `Debug` output so it cannot leak into
/// logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret token value
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if the token is the empty string (public access)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken(***)")
    }
}

// ============================================================================
// Scope
// ============================================================================

/// The authentication/USN scope an entity belongs to.
///
/// The user's own account and each linked notebook carry independent USN
/// streams and sync states. A single keyed mapping over `Scope` replaces
/// separate user-own and linked-notebook code paths throughout the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// The user's own account
    UserOwn,
    /// Content shared through the linked notebook with this guid
    LinkedNotebook(Guid),
}

impl Scope {
    /// Returns the linked notebook guid, or `None` for the user's own scope
    pub fn linked_notebook_guid(&self) -> Option<&Guid> {
        match self {
            Scope::UserOwn => None,
            Scope::LinkedNotebook(guid) => Some(guid),
        }
    }

    /// Returns true for the user's own scope
    pub fn is_user_own(&self) -> bool {
        matches!(self, Scope::UserOwn)
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Scope::UserOwn => write!(f, "user's own account"),
            Scope::LinkedNotebook(guid) => write!(f, "linked notebook {guid}"),
        }
    }
}

impl From<Option<Guid>> for Scope {
    fn from(guid: Option<Guid>) -> Self {
        match guid {
            Some(guid) => Scope::LinkedNotebook(guid),
            None => Scope::UserOwn,
        }
    }
}
