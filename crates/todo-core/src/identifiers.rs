//! Todo identifiers.
//!
//! # Parse-at-Boundaries Pattern
//!
//! `TodoId` validates on construction and trims surrounding whitespace
//! first, so an invalid id cannot be represented. Deserialization goes
//! through the same validation.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a todo id, in bytes.
pub const MAX_TODO_ID_LEN: usize = 128;

// ============================================================================
// IDENTIFIER ERROR
// ============================================================================

/// Validation failure for an identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Identifier is empty or contains only whitespace
    #[error("identifier cannot be empty")]
    Empty,

    /// Identifier exceeds maximum length
    #[error("identifier too long: {actual} characters (max {max})")]
    TooLong {
        /// The maximum allowed length
        max: usize,
        /// The actual length provided
        actual: usize,
    },

    /// Identifier must be ASCII
    #[error("identifier must be ASCII only: {value}")]
    NotAscii {
        /// The value that failed ASCII validation
        value: String,
    },

    /// Identifier contains whitespace or control characters
    #[error("identifier contains invalid characters: {details}")]
    InvalidCharacters {
        /// Human-readable explanation of what's invalid
        details: String,
    },
}

impl IdentifierError {
    /// Check if this is an `Empty` error
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Check if this is a `TooLong` error
    #[must_use]
    pub const fn is_too_long(&self) -> bool {
        matches!(self, Self::TooLong { .. })
    }
}

/// Rules:
/// - Non-empty
/// - At most `MAX_TODO_ID_LEN` bytes
/// - ASCII only, no whitespace or control characters
fn validate_todo_id(s: &str) -> Result<(), IdentifierError> {
    if s.is_empty() {
        return Err(IdentifierError::Empty);
    }

    if s.len() > MAX_TODO_ID_LEN {
        return Err(IdentifierError::TooLong {
            max: MAX_TODO_ID_LEN,
            actual: s.len(),
        });
    }

    if !s.is_ascii() {
        return Err(IdentifierError::NotAscii {
            value: s.to_string(),
        });
    }

    if let Some(c) = s
        .chars()
        .find(|c| c.is_ascii_whitespace() || c.is_ascii_control())
    {
        return Err(IdentifierError::InvalidCharacters {
            details: format!("todo id '{}' contains {c:?}", s.escape_default()),
        });
    }

    Ok(())
}

// ============================================================================
// TODO ID
// ============================================================================

/// A validated todo identifier.
///
/// ```rust
/// use todo_core::TodoId;
///
/// let id = TodoId::parse("  todo-42 ")?;
/// assert_eq!(id.as_str(), "todo-42");
/// # Ok::<(), todo_core::IdentifierError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TodoId(String);

impl TodoId {
    /// Parse and validate a todo id.
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError` if the trimmed id is empty, too long,
    /// non-ASCII or contains whitespace/control characters.
    pub fn parse(s: impl Into<String>) -> Result<Self, IdentifierError> {
        let s = s.into();
        let trimmed = s.trim();
        validate_todo_id(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for TodoId {
    type Error = IdentifierError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for TodoId {
    type Error = IdentifierError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<TodoId> for String {
    fn from(id: TodoId) -> Self {
        id.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TodoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
