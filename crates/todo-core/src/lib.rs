//! # Todo Core
//!
//! An event-sourced `Todo` aggregate whose commands are guarded by
//! declarative invariants.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` / `expect()` / `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Modules
//!
//! - [`identifiers`] - validated `TodoId`
//! - [`events`] - `TodoEvent`, its payloads and the stored-event envelope
//! - [`todo`] - the aggregate, its invariants and commands

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::panic))]

pub mod events;
pub mod identifiers;
pub mod todo;

pub use events::{
    deserialize_event, serialize_event, EventMetadata, StoredEvent, TodoDetails, TodoEvent,
};
pub use identifiers::{IdentifierError, TodoId};
pub use todo::{Todo, TodoError, TodoInvariant};
