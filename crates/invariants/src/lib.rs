//! # Invariants
//!
//! Declarative invariant enforcement for aggregates and state machines.
//!
//! A type registers named boolean preconditions over its private state once,
//! at type-definition time, and enforces an ordered list of them before each
//! mutating operation. The first invariant that does not hold produces a
//! typed [`InvariantViolation`] carrying a resolved [`ErrorKind`] and message.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` / `expect()` / `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Modules
//!
//! - [`registry`] - per-type invariant storage and its builder
//! - [`config`] - type and global defaults, TOML/env loading
//! - [`evaluator`] - ordered, short-circuiting enforcement with overrides
//! - [`template`] - `{condition}` / `{type}` message templates
//! - [`aggregate`] - the [`Invariants`] trait aggregates implement
//!
//! ## Error Handling
//!
//! - [`InvariantViolation`] - a domain rule failed (expected outcome)
//! - [`UnknownInvariant`] - a name was enforced that was never registered (defect)
//! - [`PredicateFailure`] - a predicate errored or panicked; kept as the
//!   violation's `source()`

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::panic))]

pub mod aggregate;
pub mod config;
mod error;
pub mod evaluator;
mod kind;
pub mod registry;
pub mod template;

pub use aggregate::Invariants;
pub use config::{
    configure_global, configure_global_from, global, is_frozen, ConfigError, Configuration,
    PartialConfiguration, TypeConfiguration,
};
pub use error::{BoxError, EnforceError, InvariantViolation, PredicateFailure, UnknownInvariant};
pub use evaluator::{EnforcementRequest, Override, Overrides};
pub use kind::ErrorKind;
pub use registry::{
    InvariantDefinition, InvariantName, InvariantSet, InvariantSetBuilder, MessageSource,
};
pub use template::{Template, TemplateError, DEFAULT_MESSAGE};
