//! Domain error types
//!
//! `DomainError` covers validation failures when constructing domain
//! values. `ErrorString` is the structured, user-presentable message the
//! engine attaches to fatal failures: a primary reason, ordered additional
//! bases accumulated while the error propagates, and a free-form details
//! string (typically the underlying adapter error).

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing or mutating domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid guid (empty or overlong)
    #[error("Invalid guid: {0}")]
    InvalidGuid(String),

    /// Invalid local id format
    #[error("Invalid id format: {0}")]
    InvalidId(String),

    /// Invalid shard id
    #[error("Invalid shard id: {0}")]
    InvalidShardId(String),

    /// An entity is missing a field the operation requires
    #[error("{entity} is missing required field {field}")]
    MissingField {
        /// Entity kind, e.g. "note"
        entity: &'static str,
        /// Field name, e.g. "guid"
        field: &'static str,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Structured, presentable error message.
///
/// Carries a primary base message, ordered additional bases appended as
/// the error crosses layers, and an optional details string with the raw
/// underlying error. Rendered as `base: additional; bases, details`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorString {
    /// Primary reason for the failure
    pub base: String,
    /// Additional bases, outermost first
    pub additional_bases: Vec<String>,
    /// Raw details from the underlying error, if any
    pub details: Option<String>,
}

impl ErrorString {
    /// Creates an error string with only a primary base
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            additional_bases: Vec::new(),
            details: None,
        }
    }

    /// Sets the details string
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Appends an additional base, preserving order of accumulation
    pub fn append_base(&mut self, base: impl Into<String>) {
        self.additional_bases.push(base.into());
    }

    /// Returns a copy with `base` pushed in front of the existing message,
    /// demoting the previous base to the first additional base.
    #[must_use]
    pub fn wrapped(&self, base: impl Into<String>) -> Self {
        let mut additional = Vec::with_capacity(self.additional_bases.len() + 1);
        additional.push(self.base.clone());
        additional.extend(self.additional_bases.iter().cloned());
        Self {
            base: base.into(),
            additional_bases: additional,
            details: self.details.clone(),
        }
    }

    /// Returns true if no message has been set at all
    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.additional_bases.is_empty() && self.details.is_none()
    }
}

impl Display for ErrorString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for base in &self.additional_bases {
            write!(f, ": {base}")?;
        }
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

impl From<String> for ErrorString {
    fn from(base: String) -> Self {
        Self::new(base)
    }
}

impl From<&str> for ErrorString {
    fn from(base: &str) -> Self {
        Self::new(base)
    }
}
