//! Error taxonomy for invariant enforcement.
//!
//! - **`InvariantViolation`**: a named domain rule failed. Expected, recoverable
//!   by the caller, never a crash.
//! - **`UnknownInvariant`**: a name was checked that its type never
//!   registered. A programming defect; propagated as-is, never mapped to a
//!   violation.
//! - **`PredicateFailure`**: a predicate errored or panicked instead of
//!   answering. Attached as the `source()` of the violation it produced.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::sync::Arc;

use thiserror::Error;

use crate::{kind::ErrorKind, registry::InvariantName};

/// Boxed error returned by fallible predicates.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unexpected failure while a predicate was running.
#[derive(Debug, Clone, Error)]
pub enum PredicateFailure {
    /// The predicate returned an error instead of a verdict
    #[error("predicate returned an error: {0}")]
    Errored(#[source] Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// The predicate panicked
    #[error("predicate panicked: {0}")]
    Panicked(String),
}

impl From<BoxError> for PredicateFailure {
    fn from(error: BoxError) -> Self {
        Self::Errored(Arc::from(error))
    }
}

/// A named invariant did not hold.
///
/// Kind and message are fully resolved; two enforcements against identical
/// state with identical arguments produce identical violations.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct InvariantViolation<N: InvariantName> {
    kind: ErrorKind,
    message: String,
    invariant: N,
    #[source]
    cause: Option<PredicateFailure>,
}

impl<N: InvariantName> InvariantViolation<N> {
    pub(crate) const fn new(
        kind: ErrorKind,
        message: String,
        invariant: N,
        cause: Option<PredicateFailure>,
    ) -> Self {
        Self {
            kind,
            message,
            invariant,
            cause,
        }
    }

    /// Resolved error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Resolved human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the invariant that failed.
    #[must_use]
    pub const fn invariant(&self) -> &N {
        &self.invariant
    }

    /// Unexpected predicate failure behind this violation, if any.
    #[must_use]
    pub const fn cause(&self) -> Option<&PredicateFailure> {
        self.cause.as_ref()
    }

    /// Whether the predicate failed unexpectedly rather than answering "no".
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        self.cause.is_some()
    }
}

/// A name was enforced that its type never registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant `{name}` is not registered for `{type_name}`")]
pub struct UnknownInvariant {
    type_name: &'static str,
    name: String,
}

impl UnknownInvariant {
    pub(crate) fn new(type_name: &'static str, name: &dyn std::fmt::Display) -> Self {
        Self {
            type_name,
            name: name.to_string(),
        }
    }

    /// Type whose registry was consulted.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The missing invariant name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Outcome of a failed enforcement.
#[derive(Debug, Clone, Error)]
pub enum EnforceError<N: InvariantName> {
    /// A domain rule failed
    #[error(transparent)]
    Violation(#[from] InvariantViolation<N>),

    /// Registry misuse
    #[error(transparent)]
    Unknown(#[from] UnknownInvariant),
}

impl<N: InvariantName> EnforceError<N> {
    /// The violation, if this is one.
    #[must_use]
    pub const fn violation(&self) -> Option<&InvariantViolation<N>> {
        match self {
            Self::Violation(violation) => Some(violation),
            Self::Unknown(_) => None,
        }
    }

    /// Consume into the violation, if this is one.
    #[must_use]
    pub fn into_violation(self) -> Option<InvariantViolation<N>> {
        match self {
            Self::Violation(violation) => Some(violation),
            Self::Unknown(_) => None,
        }
    }

    /// Whether a domain rule failed.
    #[must_use]
    pub const fn is_violation(&self) -> bool {
        matches!(self, Self::Violation(_))
    }

    /// Whether the registry was misused.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Error kind of the violation; `None` for registry misuse.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Violation(violation) => Some(violation.kind()),
            Self::Unknown(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_violation_displays_message() {
        let violation =
            InvariantViolation::new(ErrorKind::Conflict, "nope".to_string(), "added", None);
        assert_eq!(violation.to_string(), "nope");
        assert_eq!(violation.kind(), ErrorKind::Conflict);
        assert_eq!(*violation.invariant(), "added");
        assert!(violation.source().is_none());
        assert!(!violation.is_unexpected());
    }

    #[test]
    fn test_violation_exposes_cause_as_source() {
        let boxed: BoxError = "disk on fire".into();
        let violation = InvariantViolation::new(
            ErrorKind::Generic,
            "configured".to_string(),
            "added",
            Some(PredicateFailure::from(boxed)),
        );

        let source = violation.source().expect("cause attached");
        assert_eq!(source.to_string(), "predicate returned an error: disk on fire");
        let root = source.source().expect("original error preserved");
        assert_eq!(root.to_string(), "disk on fire");
    }

    #[test]
    fn test_unknown_invariant_display() {
        let unknown = UnknownInvariant::new("Todo", &"nonexistent");
        assert_eq!(
            unknown.to_string(),
            "invariant `nonexistent` is not registered for `Todo`"
        );
        assert_eq!(unknown.type_name(), "Todo");
        assert_eq!(unknown.name(), "nonexistent");
    }

    #[test]
    fn test_enforce_error_accessors() {
        let violation: EnforceError<&str> =
            InvariantViolation::new(ErrorKind::NotFound, "gone".to_string(), "added", None).into();
        assert!(violation.is_violation());
        assert_eq!(violation.kind(), Some(ErrorKind::NotFound));
        assert_eq!(violation.to_string(), "gone");

        let unknown: EnforceError<&str> = UnknownInvariant::new("Todo", &"x").into();
        assert!(unknown.is_unknown());
        assert!(unknown.violation().is_none());
        assert_eq!(unknown.kind(), None);
        assert!(unknown.into_violation().is_none());
    }
}
