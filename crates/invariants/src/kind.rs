//! Error kind classification carried by every invariant violation.
//!
//! The kind lets the host of an aggregate map a violation onto its own
//! response classes (for example an "unprocessable entity" reply) without
//! matching on message text.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Classification of an invariant violation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ErrorKind {
    /// No particular classification
    #[default]
    Generic,
    /// The request was well-formed but cannot be applied to the current state
    Unprocessable,
    /// The request conflicts with the current state
    Conflict,
    /// The target of the request does not exist
    NotFound,
    /// A precondition the caller relied on no longer holds
    PreconditionFailed,
    /// The request arguments are invalid
    InvalidArgument,
}

impl ErrorKind {
    /// Stable kebab-case name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
