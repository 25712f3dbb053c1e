//! Invariant evaluation.
//!
//! Invariants are checked strictly in the order requested. The first one
//! that does not hold stops evaluation; later invariants are never run.
//!
//! For a failing invariant the message resolves through
//! call-site override → invariant default message → type default → global
//! default, and the error kind through call-site override → type default →
//! global default.
//!
//! A predicate that returns an error or panics still produces an
//! [`InvariantViolation`] with the resolved message; the original failure is
//! kept as the violation's `source()`. A computed message that panics falls
//! back to the type or global default.
//!
//! Overrides keyed by a name that is not being enforced are ignored.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::{
    any::Any,
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
};

use crate::{
    config::Configuration,
    error::{EnforceError, InvariantViolation, PredicateFailure},
    kind::ErrorKind,
    registry::{InvariantDefinition, InvariantName, InvariantSet},
};

// ============================================================================
// OVERRIDES
// ============================================================================

/// Call-site replacement for one invariant's message and/or kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Override {
    /// Used verbatim instead of any configured message
    pub message: Option<String>,
    /// Used instead of any configured kind
    pub error_kind: Option<ErrorKind>,
}

/// Per-name overrides for one enforcement.
#[derive(Debug, Clone)]
pub struct Overrides<N> {
    entries: HashMap<N, Override>,
}

impl<N> Default for Overrides<N> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<N: InvariantName> Overrides<N> {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the message for `name`.
    #[must_use]
    pub fn message(mut self, name: N, message: impl Into<String>) -> Self {
        self.entries.entry(name).or_default().message = Some(message.into());
        self
    }

    /// Override the error kind for `name`.
    #[must_use]
    pub fn error_kind(mut self, name: N, kind: ErrorKind) -> Self {
        self.entries.entry(name).or_default().error_kind = Some(kind);
        self
    }

    /// Replace the whole override for `name`.
    pub fn insert(&mut self, name: N, entry: Override) {
        self.entries.insert(name, entry);
    }

    /// Override for `name`, if any.
    pub fn get(&self, name: &N) -> Option<&Override> {
        self.entries.get(name)
    }

    /// Number of names with an override.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no overrides.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn keys(&self) -> impl Iterator<Item = &N> {
        self.entries.keys()
    }
}

// ============================================================================
// ENFORCEMENT REQUEST
// ============================================================================

/// Ordered names plus overrides for a single enforcement.
///
/// ```rust
/// use invariants::{EnforcementRequest, ErrorKind};
///
/// let request = EnforcementRequest::new(["added", "not_completed"])
///     .message("not_completed", "already done")
///     .error_kind("not_completed", ErrorKind::Conflict);
///
/// assert_eq!(request.names(), &["added", "not_completed"]);
/// ```
#[derive(Debug, Clone)]
pub struct EnforcementRequest<N> {
    names: Vec<N>,
    overrides: Overrides<N>,
}

impl<N: InvariantName> EnforcementRequest<N> {
    /// Request enforcing `names` in order.
    pub fn new(names: impl IntoIterator<Item = N>) -> Self {
        Self {
            names: names.into_iter().collect(),
            overrides: Overrides::new(),
        }
    }

    /// Override the message for `name`.
    #[must_use]
    pub fn message(mut self, name: N, message: impl Into<String>) -> Self {
        self.overrides = self.overrides.message(name, message);
        self
    }

    /// Override the error kind for `name`.
    #[must_use]
    pub fn error_kind(mut self, name: N, kind: ErrorKind) -> Self {
        self.overrides = self.overrides.error_kind(name, kind);
        self
    }

    /// Replace all overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides<N>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Names, in enforcement order.
    pub fn names(&self) -> &[N] {
        &self.names
    }

    /// Overrides for this request.
    pub const fn overrides(&self) -> &Overrides<N> {
        &self.overrides
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

enum Verdict {
    Holds,
    Violated(Option<PredicateFailure>),
}

impl<S, N: InvariantName> InvariantSet<S, N> {
    /// Enforce `names` in order against `instance`.
    ///
    /// # Errors
    ///
    /// Returns `EnforceError::Violation` for the first invariant that does not
    /// hold, or `EnforceError::Unknown` when a name is reached that was never
    /// registered.
    pub fn enforce(&self, instance: &S, names: &[N]) -> Result<(), EnforceError<N>> {
        self.enforce_with(instance, names, &Overrides::new())
    }

    /// Enforce a prepared request.
    ///
    /// # Errors
    ///
    /// As [`Self::enforce`].
    pub fn enforce_request(
        &self,
        instance: &S,
        request: &EnforcementRequest<N>,
    ) -> Result<(), EnforceError<N>> {
        self.enforce_with(instance, request.names(), request.overrides())
    }

    /// Enforce `names` in order, applying `overrides` to failures.
    ///
    /// # Errors
    ///
    /// As [`Self::enforce`].
    pub fn enforce_with(
        &self,
        instance: &S,
        names: &[N],
        overrides: &Overrides<N>,
    ) -> Result<(), EnforceError<N>> {
        for ignored in overrides.keys().filter(|name| !names.contains(name)) {
            tracing::trace!(
                type_name = self.type_name(),
                invariant = %ignored,
                "override ignored: invariant not enforced"
            );
        }

        let config = self.configuration();

        for name in names {
            let definition = self.lookup(name)?;
            tracing::trace!(type_name = self.type_name(), invariant = %name, "checking invariant");

            if let Verdict::Violated(cause) = evaluate(definition, instance) {
                let violation =
                    self.violation(config, definition, instance, overrides.get(name), cause);
                tracing::debug!(
                    type_name = self.type_name(),
                    invariant = %name,
                    kind = %violation.kind(),
                    message = violation.message(),
                    "invariant violated"
                );
                return Err(violation.into());
            }
        }

        Ok(())
    }

    fn violation(
        &self,
        config: &Configuration,
        definition: &InvariantDefinition<S, N>,
        instance: &S,
        entry: Option<&Override>,
        cause: Option<PredicateFailure>,
    ) -> InvariantViolation<N> {
        let name = definition.name();
        let mut cause = cause;

        let message = entry
            .and_then(|entry| entry.message.clone())
            .or_else(|| {
                let source = definition.default_message()?;
                match panic::catch_unwind(AssertUnwindSafe(|| {
                    source.render(instance, name, self.type_name())
                })) {
                    Ok(message) => Some(message),
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        tracing::warn!(invariant = %name, panic = %message, "invariant message panicked");
                        // A predicate failure stays the primary cause.
                        cause.get_or_insert(PredicateFailure::Panicked(message));
                        None
                    }
                }
            })
            .unwrap_or_else(|| config.default_message.render(name, self.type_name()));
        let kind = entry
            .and_then(|entry| entry.error_kind)
            .unwrap_or(config.default_error_kind);

        InvariantViolation::new(kind, message, name.clone(), cause)
    }
}

fn evaluate<S, N: InvariantName>(definition: &InvariantDefinition<S, N>, instance: &S) -> Verdict {
    match panic::catch_unwind(AssertUnwindSafe(|| definition.check(instance))) {
        Ok(Ok(true)) => Verdict::Holds,
        Ok(Ok(false)) => Verdict::Violated(None),
        Ok(Err(error)) => {
            tracing::warn!(invariant = %definition.name(), %error, "invariant predicate failed");
            Verdict::Violated(Some(PredicateFailure::from(error)))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(invariant = %definition.name(), panic = %message, "invariant predicate panicked");
            Verdict::Violated(Some(PredicateFailure::Panicked(message)))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::{registry::MessageSource, template::Template};

    struct Flags {
        a: bool,
        b: bool,
    }

    fn flags_set() -> InvariantSet<Flags, &'static str> {
        InvariantSet::builder("Flags")
            .invariant("a", |f: &Flags| f.a)
            .invariant("b", |f: &Flags| f.b)
            .build()
    }

    #[test]
    fn test_empty_names_is_noop() {
        let set = flags_set();
        assert!(set.enforce(&Flags { a: false, b: false }, &[]).is_ok());
    }

    #[test]
    fn test_all_holding_returns_ok() {
        let set = flags_set();
        assert!(set.enforce(&Flags { a: true, b: true }, &["a", "b"]).is_ok());
    }

    #[test]
    fn test_first_failure_reported() {
        let set = flags_set();
        let state = Flags { a: false, b: false };

        let error = set.enforce(&state, &["a", "b"]).expect_err("a fails");
        assert_eq!(error.violation().map(|v| *v.invariant()), Some("a"));

        let error = set.enforce(&state, &["b", "a"]).expect_err("b fails");
        assert_eq!(error.violation().map(|v| *v.invariant()), Some("b"));
    }

    #[test]
    fn test_short_circuit_skips_later_predicates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let set = InvariantSet::<Flags, &'static str>::builder("Flags")
            .invariant("a", |f: &Flags| f.a)
            .invariant("counted", move |_: &Flags| {
                counter.fetch_add(1, Ordering::SeqCst);
                false
            })
            .build();

        let state = Flags { a: false, b: false };
        assert!(set.enforce(&state, &["a", "counted"]).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(set.enforce(&state, &["counted", "a"]).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_name_propagates_unwrapped() {
        let set = flags_set();
        let error = set
            .enforce(&Flags { a: true, b: true }, &["a", "nonexistent"])
            .expect_err("unknown name");

        assert!(error.is_unknown());
        assert_eq!(
            error.to_string(),
            "invariant `nonexistent` is not registered for `Flags`"
        );
    }

    #[test]
    fn test_earlier_violation_wins_over_later_unknown_name() {
        let set = flags_set();
        let error = set
            .enforce(&Flags { a: false, b: true }, &["a", "nonexistent"])
            .expect_err("a fails first");
        assert!(error.is_violation());
    }

    #[test]
    fn test_global_default_message_and_kind() {
        let set = flags_set();
        let error = set
            .enforce(&Flags { a: false, b: true }, &["a"])
            .expect_err("a fails");
        let violation = error.violation().expect("violation");

        assert_eq!(violation.message(), "Invariant cannot be enforced: a");
        assert_eq!(violation.kind(), ErrorKind::Generic);
        assert!(violation.cause().is_none());
    }

    #[test]
    fn test_message_precedence_chain() {
        let set = InvariantSet::<Flags, &'static str>::builder("Flags")
            .invariant_with_message(
                "a",
                |f: &Flags| f.a,
                MessageSource::computed(|f: &Flags| format!("a is {}", f.a)),
            )
            .invariant("b", |f: &Flags| f.b)
            .configure(|cfg| {
                cfg.default_error_kind = Some(ErrorKind::Unprocessable);
                cfg.default_message =
                    Some(Template::parse("{type} refused {condition}").expect("valid"));
            })
            .build();
        let state = Flags { a: false, b: false };

        // invariant default beats type default
        let error = set.enforce(&state, &["a"]).expect_err("a fails");
        assert_eq!(error.to_string(), "a is false");
        assert_eq!(error.kind(), Some(ErrorKind::Unprocessable));

        // type default with substitution
        let error = set.enforce(&state, &["b"]).expect_err("b fails");
        assert_eq!(error.to_string(), "Flags refused b");

        // override beats both
        let overrides = Overrides::new()
            .message("a", "custom")
            .error_kind("a", ErrorKind::Conflict);
        let error = set
            .enforce_with(&state, &["a"], &overrides)
            .expect_err("a fails");
        assert_eq!(error.to_string(), "custom");
        assert_eq!(error.kind(), Some(ErrorKind::Conflict));
    }

    #[test]
    fn test_partial_override_falls_back_per_field() {
        let set = flags_set();
        let state = Flags { a: false, b: false };

        let only_kind = Overrides::new().error_kind("a", ErrorKind::NotFound);
        let error = set
            .enforce_with(&state, &["a"], &only_kind)
            .expect_err("a fails");
        assert_eq!(error.to_string(), "Invariant cannot be enforced: a");
        assert_eq!(error.kind(), Some(ErrorKind::NotFound));

        let only_message = Overrides::new().message("a", "just the message");
        let error = set
            .enforce_with(&state, &["a"], &only_message)
            .expect_err("a fails");
        assert_eq!(error.to_string(), "just the message");
        assert_eq!(error.kind(), Some(ErrorKind::Generic));
    }

    #[test]
    fn test_override_for_unrequested_name_is_ignored() {
        let set = flags_set();
        let overrides = Overrides::new().message("b", "never used");

        assert!(set
            .enforce_with(&Flags { a: true, b: false }, &["a"], &overrides)
            .is_ok());

        let error = set
            .enforce_with(&Flags { a: false, b: false }, &["a"], &overrides)
            .expect_err("a fails");
        assert_eq!(error.to_string(), "Invariant cannot be enforced: a");
    }

    #[test]
    fn test_erroring_predicate_is_wrapped() {
        let set = InvariantSet::<Flags, &'static str>::builder("Flags")
            .try_invariant("io", |_: &Flags| -> Result<bool, std::io::Error> {
                Err(std::io::Error::other("backend unavailable"))
            })
            .build();

        let error = set
            .enforce(&Flags { a: true, b: true }, &["io"])
            .expect_err("predicate errored");
        let violation = error.violation().expect("wrapped into a violation");

        assert_eq!(violation.message(), "Invariant cannot be enforced: io");
        assert!(violation.is_unexpected());
        assert!(matches!(violation.cause(), Some(PredicateFailure::Errored(_))));
        assert!(violation
            .cause()
            .map(ToString::to_string)
            .is_some_and(|cause| cause.contains("backend unavailable")));
    }

    #[test]
    fn test_panicking_predicate_is_wrapped() {
        let set = InvariantSet::<Flags, &'static str>::builder("Flags")
            .invariant("boom", |_: &Flags| -> bool { panic!("predicate exploded") })
            .build();

        let error = set
            .enforce(&Flags { a: true, b: true }, &["boom"])
            .expect_err("predicate panicked");
        let violation = error.violation().expect("wrapped into a violation");

        assert_eq!(violation.message(), "Invariant cannot be enforced: boom");
        assert!(matches!(
            violation.cause(),
            Some(PredicateFailure::Panicked(message)) if message == "predicate exploded"
        ));
    }

    struct Batch {
        items: Vec<i32>,
    }

    fn batch_set() -> InvariantSet<Batch, &'static str> {
        InvariantSet::builder("Batch")
            .invariant_with_message(
                "first_positive",
                |batch: &Batch| batch.items.first().is_some_and(|item| *item > 0),
                MessageSource::computed(|batch: &Batch| {
                    format!("first item {} is not positive", batch.items[0])
                }),
            )
            .register(
                InvariantDefinition::fallible("checked", |_: &Batch| {
                    Err::<bool, _>(std::io::Error::other("store offline"))
                })
                .with_message(MessageSource::computed(|batch: &Batch| {
                    format!("item {} failed its check", batch.items[0])
                })),
            )
            .build()
    }

    #[test]
    fn test_panicking_message_falls_back_to_configured_default() {
        let set = batch_set();

        let error = set
            .enforce(&Batch { items: Vec::new() }, &["first_positive"])
            .expect_err("empty batch fails");
        let violation = error.violation().expect("wrapped into a violation");

        assert_eq!(
            violation.message(),
            "Invariant cannot be enforced: first_positive"
        );
        assert_eq!(violation.kind(), ErrorKind::Generic);
        assert!(violation.is_unexpected());
        assert!(matches!(
            violation.cause(),
            Some(PredicateFailure::Panicked(message)) if message.contains("out of bounds")
        ));

        let error = set
            .enforce(&Batch { items: vec![-3] }, &["first_positive"])
            .expect_err("negative first item");
        assert_eq!(error.to_string(), "first item -3 is not positive");
        assert!(error.violation().is_some_and(|v| v.cause().is_none()));
    }

    #[test]
    fn test_panicking_message_keeps_override_and_predicate_cause() {
        let set = batch_set();
        let empty = Batch { items: Vec::new() };

        let overrides = Overrides::new().message("first_positive", "batch is empty");
        let error = set
            .enforce_with(&empty, &["first_positive"], &overrides)
            .expect_err("empty batch fails");
        assert_eq!(error.to_string(), "batch is empty");
        assert!(error.violation().is_some_and(|v| v.cause().is_none()));

        let error = set.enforce(&empty, &["checked"]).expect_err("store offline");
        assert_eq!(error.to_string(), "Invariant cannot be enforced: checked");
        let cause = error.violation().and_then(InvariantViolation::cause);
        assert!(matches!(cause, Some(PredicateFailure::Errored(_))));
        assert!(cause.is_some_and(|cause| cause.to_string().contains("store offline")));
    }

    #[test]
    fn test_enforce_request_applies_overrides() {
        let set = flags_set();
        let request = EnforcementRequest::new(["a", "b"]).message("b", "b override");

        let error = set
            .enforce_request(&Flags { a: true, b: false }, &request)
            .expect_err("b fails");
        assert_eq!(error.to_string(), "b override");
    }

    #[test]
    fn test_overrides_builder_merges_fields() {
        let overrides = Overrides::new()
            .message("a", "m")
            .error_kind("a", ErrorKind::Conflict);
        assert_eq!(overrides.len(), 1);
        assert_eq!(
            overrides.get(&"a"),
            Some(&Override {
                message: Some("m".to_string()),
                error_kind: Some(ErrorKind::Conflict),
            })
        );
    }

    #[test]
    fn test_panic_message_handles_string_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");

        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
