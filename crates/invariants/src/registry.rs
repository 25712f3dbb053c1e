//! Per-type invariant registry.
//!
//! Each type that enforces invariants owns one [`InvariantSet`], built once
//! through [`InvariantSetBuilder`] (normally inside a `LazyLock` static) and
//! read-only from then on. Registration must finish before any enforcement is
//! reachable; nothing guards concurrent registration.
//!
//! Predicates are closures over `&S`. Defining them in the module that
//! defines `S` lets them read private fields without any public accessor.
//!
//! ```rust
//! use invariants::{ErrorKind, InvariantSet};
//!
//! struct Counter {
//!     value: u32,
//! }
//!
//! let set = InvariantSet::<Counter, &'static str>::builder("Counter")
//!     .invariant("positive", |c: &Counter| c.value > 0)
//!     .configure(|cfg| cfg.default_error_kind = Some(ErrorKind::Conflict))
//!     .build();
//!
//! assert!(set.enforce(&Counter { value: 1 }, &["positive"]).is_ok());
//! assert!(set.enforce(&Counter { value: 0 }, &["positive"]).is_err());
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::{collections::HashMap, fmt, hash::Hash, sync::OnceLock};

use itertools::Itertools;
use strum::IntoEnumIterator;

use crate::{
    config::{self, Configuration, TypeConfiguration},
    error::{BoxError, UnknownInvariant},
    template::Template,
};

// ============================================================================
// NAMES
// ============================================================================

/// Key identifying an invariant within its type.
///
/// Closed enums are preferred: combined with [`InvariantSet::check_exhaustive`]
/// they let a test prove every name the type can enforce is registered.
/// String keys work too.
pub trait InvariantName:
    Eq + Hash + Clone + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

impl<T> InvariantName for T where
    T: Eq + Hash + Clone + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

// ============================================================================
// DEFINITIONS
// ============================================================================

type Predicate<S> = Box<dyn Fn(&S) -> Result<bool, BoxError> + Send + Sync>;

/// Default message attached to a single invariant.
pub enum MessageSource<S> {
    /// Rendered with the invariant and type names
    Template(Template),
    /// Computed from the instance (e.g. to mention its id)
    Computed(Box<dyn Fn(&S) -> String + Send + Sync>),
}

impl<S> MessageSource<S> {
    /// Message computed from the instance state.
    pub fn computed<F>(message: F) -> Self
    where
        F: Fn(&S) -> String + Send + Sync + 'static,
    {
        Self::Computed(Box::new(message))
    }

    pub(crate) fn render(&self, instance: &S, name: &dyn fmt::Display, type_name: &str) -> String {
        match self {
            Self::Template(template) => template.render(name, type_name),
            Self::Computed(message) => message(instance),
        }
    }
}

impl<S> From<Template> for MessageSource<S> {
    fn from(template: Template) -> Self {
        Self::Template(template)
    }
}

impl<S> fmt::Debug for MessageSource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template(template) => f.debug_tuple("Template").field(template).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// A registered invariant: name, predicate, optional default message.
pub struct InvariantDefinition<S, N> {
    name: N,
    check: Predicate<S>,
    default_message: Option<MessageSource<S>>,
}

impl<S, N: InvariantName> InvariantDefinition<S, N> {
    /// Definition with an infallible predicate.
    pub fn new<F>(name: N, check: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            check: Box::new(move |instance: &S| Ok::<_, BoxError>(check(instance))),
            default_message: None,
        }
    }

    /// Definition whose predicate may fail unexpectedly.
    ///
    /// An `Err` is not a verdict: the evaluator turns it into a violation
    /// carrying the error as its cause.
    pub fn fallible<F, E>(name: N, check: F) -> Self
    where
        F: Fn(&S) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            name,
            check: Box::new(move |instance: &S| check(instance).map_err(Into::<BoxError>::into)),
            default_message: None,
        }
    }

    /// Attach a default message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<MessageSource<S>>) -> Self {
        self.default_message = Some(message.into());
        self
    }

    /// The invariant name.
    pub const fn name(&self) -> &N {
        &self.name
    }

    /// The invariant's own default message, if any.
    pub const fn default_message(&self) -> Option<&MessageSource<S>> {
        self.default_message.as_ref()
    }

    pub(crate) fn check(&self, instance: &S) -> Result<bool, BoxError> {
        (self.check)(instance)
    }
}

impl<S, N: fmt::Debug> fmt::Debug for InvariantDefinition<S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvariantDefinition")
            .field("name", &self.name)
            .field("default_message", &self.default_message)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// INVARIANT SET
// ============================================================================

/// All invariants of one type, plus that type's configuration.
pub struct InvariantSet<S, N> {
    type_name: &'static str,
    definitions: HashMap<N, InvariantDefinition<S, N>>,
    type_config: TypeConfiguration,
    resolved: OnceLock<Configuration>,
}

impl<S, N: InvariantName> InvariantSet<S, N> {
    /// Empty set for `type_name`.
    #[must_use]
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            definitions: HashMap::new(),
            type_config: TypeConfiguration::default(),
            resolved: OnceLock::new(),
        }
    }

    /// Start building a set for `type_name`.
    #[must_use]
    pub fn builder(type_name: &'static str) -> InvariantSetBuilder<S, N> {
        InvariantSetBuilder {
            set: Self::new(type_name),
        }
    }

    /// Add `definition`, replacing any earlier definition with the same name.
    pub fn register(&mut self, definition: InvariantDefinition<S, N>) {
        let name = definition.name.clone();
        if self.definitions.insert(name.clone(), definition).is_some() {
            tracing::debug!(
                type_name = self.type_name,
                invariant = %name,
                "replaced invariant definition"
            );
        }
    }

    /// Look up a definition.
    ///
    /// # Errors
    ///
    /// Returns `UnknownInvariant` if `name` was never registered.
    pub fn lookup(&self, name: &N) -> Result<&InvariantDefinition<S, N>, UnknownInvariant> {
        self.definitions
            .get(name)
            .ok_or_else(|| UnknownInvariant::new(self.type_name, name))
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &N) -> bool {
        self.definitions.contains_key(name)
    }

    /// Registered names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &N> {
        self.definitions.keys()
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Name of the owning type.
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The type's own, unresolved configuration.
    pub const fn type_configuration(&self) -> &TypeConfiguration {
        &self.type_config
    }

    /// Type configuration resolved against the global configuration.
    ///
    /// Resolved at the first call and cached; this also freezes the global
    /// configuration.
    pub fn configuration(&self) -> &Configuration {
        self.resolved.get_or_init(|| {
            let resolved = self.type_config.resolve(config::global());
            tracing::debug!(
                type_name = self.type_name,
                default_error_kind = %resolved.default_error_kind,
                "resolved invariant configuration"
            );
            resolved
        })
    }

    /// Verify every variant of `N` is registered.
    ///
    /// # Errors
    ///
    /// Returns `UnknownInvariant` for the first unregistered variant.
    pub fn check_exhaustive(&self) -> Result<(), UnknownInvariant>
    where
        N: IntoEnumIterator,
    {
        N::iter()
            .find(|name| !self.contains(name))
            .map_or(Ok(()), |missing| {
                Err(UnknownInvariant::new(self.type_name, &missing))
            })
    }
}

impl<S, N: InvariantName> fmt::Debug for InvariantSet<S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .definitions
            .keys()
            .map(ToString::to_string)
            .sorted()
            .join(", ");
        f.debug_struct("InvariantSet")
            .field("type_name", &self.type_name)
            .field("invariants", &names)
            .field("type_config", &self.type_config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builder for an [`InvariantSet`].
pub struct InvariantSetBuilder<S, N> {
    set: InvariantSet<S, N>,
}

impl<S, N: InvariantName> InvariantSetBuilder<S, N> {
    /// Register an infallible predicate.
    #[must_use]
    pub fn invariant<F>(self, name: N, check: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.register(InvariantDefinition::new(name, check))
    }

    /// Register an infallible predicate with its own default message.
    #[must_use]
    pub fn invariant_with_message<F>(
        self,
        name: N,
        check: F,
        message: impl Into<MessageSource<S>>,
    ) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.register(InvariantDefinition::new(name, check).with_message(message))
    }

    /// Register a predicate that may fail unexpectedly.
    #[must_use]
    pub fn try_invariant<F, E>(self, name: N, check: F) -> Self
    where
        F: Fn(&S) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.register(InvariantDefinition::fallible(name, check))
    }

    /// Register a prepared definition (last write wins).
    #[must_use]
    pub fn register(mut self, definition: InvariantDefinition<S, N>) -> Self {
        self.set.register(definition);
        self
    }

    /// Set the type's default error kind and message.
    #[must_use]
    pub fn configure<F>(mut self, mutator: F) -> Self
    where
        F: FnOnce(&mut TypeConfiguration),
    {
        mutator(&mut self.set.type_config);
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> InvariantSet<S, N> {
        tracing::trace!(
            type_name = self.set.type_name,
            invariants = self.set.len(),
            "invariant set built"
        );
        self.set
    }

    /// Finish building, requiring every variant of `N` to be registered.
    ///
    /// # Errors
    ///
    /// Returns `UnknownInvariant` for the first unregistered variant.
    pub fn build_exhaustive(self) -> Result<InvariantSet<S, N>, UnknownInvariant>
    where
        N: IntoEnumIterator,
    {
        let set = self.build();
        set.check_exhaustive()?;
        Ok(set)
    }
}
