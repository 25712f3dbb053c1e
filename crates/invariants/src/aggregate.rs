//! Aggregate-facing contract.
//!
//! A type opts in by naming its invariant key type and exposing its
//! registry, usually a `LazyLock` static built next to the type's private
//! fields. Enforcement then reads the instance through the registered
//! closures only.
//!
//! ```rust
//! use std::sync::LazyLock;
//!
//! use invariants::{Invariants, InvariantSet};
//!
//! struct Door {
//!     open: bool,
//! }
//!
//! static DOOR_INVARIANTS: LazyLock<InvariantSet<Door, &'static str>> = LazyLock::new(|| {
//!     InvariantSet::builder("Door")
//!         .invariant("closed", |door: &Door| !door.open)
//!         .build()
//! });
//!
//! impl Invariants for Door {
//!     type Name = &'static str;
//!
//!     fn invariants() -> &'static InvariantSet<Self, Self::Name> {
//!         &DOOR_INVARIANTS
//!     }
//! }
//!
//! assert!(Door { open: false }.enforce(&["closed"]).is_ok());
//! assert!(Door { open: true }.enforce(&["closed"]).is_err());
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::{
    error::EnforceError,
    evaluator::{EnforcementRequest, Overrides},
    registry::{InvariantName, InvariantSet},
};

/// A type whose operations are guarded by named invariants.
pub trait Invariants: Sized + 'static {
    /// Key type naming this type's invariants.
    type Name: InvariantName;

    /// The type's registry. Must be fully built before it is returned.
    fn invariants() -> &'static InvariantSet<Self, Self::Name>;

    /// Enforce `names` in order against `self`.
    ///
    /// # Errors
    ///
    /// Returns the first violation, or `EnforceError::Unknown` for an
    /// unregistered name.
    fn enforce(&self, names: &[Self::Name]) -> Result<(), EnforceError<Self::Name>> {
        Self::invariants().enforce(self, names)
    }

    /// Enforce `names` in order, applying `overrides` to failures.
    ///
    /// # Errors
    ///
    /// As [`Invariants::enforce`].
    fn enforce_with(
        &self,
        names: &[Self::Name],
        overrides: &Overrides<Self::Name>,
    ) -> Result<(), EnforceError<Self::Name>> {
        Self::invariants().enforce_with(self, names, overrides)
    }

    /// Enforce a prepared request.
    ///
    /// # Errors
    ///
    /// As [`Invariants::enforce`].
    fn enforce_request(
        &self,
        request: &EnforcementRequest<Self::Name>,
    ) -> Result<(), EnforceError<Self::Name>> {
        Self::invariants().enforce_request(self, request)
    }
}
