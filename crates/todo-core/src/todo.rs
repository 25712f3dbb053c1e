//! Todo aggregate root.
//!
//! A todo is added once, amended any number of times, and ends either
//! completed or abandoned:
//!
//! ```text
//! absent → added → {amended}* → (completed | abandoned)
//! ```
//!
//! # Invariants
//!
//! | Command  | Checked, in order                      |
//! |----------|----------------------------------------|
//! | add      | not_added                              |
//! | amend    | added, not_completed, not_abandoned    |
//! | complete | added, not_completed, not_abandoned    |
//! | abandon  | added, not_completed, not_abandoned    |
//!
//! The predicates read the aggregate's private fields directly; none of
//! that state is exposed for their sake. Violations carry
//! `ErrorKind::Unprocessable`.
//!
//! # Event sourcing
//!
//! Commands never mutate state directly. They record an event and apply
//! it, so state after a command equals state after replaying its events
//! through [`Todo::load`].

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::sync::LazyLock;

use chrono::NaiveDate;
use invariants::{EnforceError, ErrorKind, InvariantSet, Invariants, MessageSource};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::{
    events::{TodoDetails, TodoEvent},
    identifiers::TodoId,
};

// ============================================================================
// DOMAIN ERRORS
// ============================================================================

/// Errors raised by todo commands and replay.
#[derive(Debug, Clone, Error)]
pub enum TodoError {
    /// A command's precondition did not hold
    #[error(transparent)]
    Invariant(#[from] EnforceError<TodoInvariant>),

    /// An event belonging to another todo was applied
    #[error("event for todo \"{event}\" cannot be applied to todo \"{todo}\"")]
    ForeignEvent { todo: TodoId, event: TodoId },
}

impl TodoError {
    /// The violated invariant, if a command was rejected.
    #[must_use]
    pub fn invariant(&self) -> Option<TodoInvariant> {
        match self {
            Self::Invariant(error) => error.violation().map(|violation| *violation.invariant()),
            Self::ForeignEvent { .. } => None,
        }
    }

    /// Error kind of the violation, if a command was rejected.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Invariant(error) => error.kind(),
            Self::ForeignEvent { .. } => None,
        }
    }
}

// ============================================================================
// INVARIANTS
// ============================================================================

/// Preconditions of todo commands.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum TodoInvariant {
    /// The todo has not been added yet
    NotAdded,
    /// The todo has been added
    Added,
    /// The todo is not complete
    NotCompleted,
    /// The todo is not abandoned
    NotAbandoned,
}

const OPEN_TODO: [TodoInvariant; 3] = [
    TodoInvariant::Added,
    TodoInvariant::NotCompleted,
    TodoInvariant::NotAbandoned,
];

fn todo_message(suffix: &'static str) -> MessageSource<Todo> {
    MessageSource::computed(move |todo: &Todo| {
        format!("Todo {:?} {suffix}", todo.id.as_str())
    })
}

static TODO_INVARIANTS: LazyLock<InvariantSet<Todo, TodoInvariant>> = LazyLock::new(|| {
    InvariantSet::builder("Todo")
        .invariant_with_message(
            TodoInvariant::NotAdded,
            |todo: &Todo| !todo.added,
            todo_message("already exists"),
        )
        .invariant_with_message(
            TodoInvariant::Added,
            |todo: &Todo| todo.added,
            todo_message("does not exist"),
        )
        .invariant_with_message(
            TodoInvariant::NotCompleted,
            |todo: &Todo| todo.completed_on.is_none(),
            todo_message("is complete"),
        )
        .invariant_with_message(
            TodoInvariant::NotAbandoned,
            |todo: &Todo| todo.abandoned_on.is_none(),
            todo_message("is abandoned"),
        )
        .configure(|cfg| cfg.default_error_kind = Some(ErrorKind::Unprocessable))
        .build()
});

// ============================================================================
// TODO AGGREGATE ROOT
// ============================================================================

/// Todo aggregate root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    id: TodoId,
    added: bool,
    details: TodoDetails,
    completed_on: Option<NaiveDate>,
    abandoned_on: Option<NaiveDate>,
    version: u64,
    changes: Vec<TodoEvent>,
}

impl Invariants for Todo {
    type Name = TodoInvariant;

    fn invariants() -> &'static InvariantSet<Self, Self::Name> {
        &TODO_INVARIANTS
    }
}

impl Todo {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// A todo with no history.
    #[must_use]
    pub fn new(id: TodoId) -> Self {
        Self {
            id,
            added: false,
            details: TodoDetails::default(),
            completed_on: None,
            abandoned_on: None,
            version: 0,
            changes: Vec::new(),
        }
    }

    /// Rebuild a todo from its committed events.
    ///
    /// # Errors
    ///
    /// Returns `TodoError::ForeignEvent` if an event belongs to another todo.
    pub fn load(id: TodoId, events: impl IntoIterator<Item = TodoEvent>) -> Result<Self, TodoError> {
        let todo = events
            .into_iter()
            .try_fold(Self::new(id), |mut todo, event| {
                todo.apply(&event)?;
                Ok::<_, TodoError>(todo)
            })?;
        tracing::debug!(todo_id = %todo.id, version = todo.version, "todo loaded");
        Ok(todo)
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    /// Add the todo.
    ///
    /// # Errors
    ///
    /// `not_added` if the todo already exists.
    pub fn add(&mut self, details: TodoDetails) -> Result<(), TodoError> {
        self.enforce(&[TodoInvariant::NotAdded])?;
        self.record(TodoEvent::added(self.id.clone(), details));
        Ok(())
    }

    /// Change some of the todo's details.
    ///
    /// # Errors
    ///
    /// `added`, `not_completed` or `not_abandoned`, whichever fails first.
    pub fn amend(&mut self, amendment: TodoDetails) -> Result<(), TodoError> {
        self.enforce(&OPEN_TODO)?;
        self.record(TodoEvent::amended(self.id.clone(), amendment));
        Ok(())
    }

    /// Mark the todo complete.
    ///
    /// # Errors
    ///
    /// `added`, `not_completed` or `not_abandoned`, whichever fails first.
    pub fn complete(&mut self, completed_on: NaiveDate) -> Result<(), TodoError> {
        self.enforce(&OPEN_TODO)?;
        self.record(TodoEvent::completed(self.id.clone(), completed_on));
        Ok(())
    }

    /// Abandon the todo.
    ///
    /// # Errors
    ///
    /// `added`, `not_completed` or `not_abandoned`, whichever fails first.
    pub fn abandon(&mut self, abandoned_on: NaiveDate) -> Result<(), TodoError> {
        self.enforce(&OPEN_TODO)?;
        self.record(TodoEvent::abandoned(self.id.clone(), abandoned_on));
        Ok(())
    }

    // ========================================================================
    // EVENT APPLICATION
    // ========================================================================

    /// Apply a committed event, as during replay. Invariants are not checked.
    ///
    /// # Errors
    ///
    /// Returns `TodoError::ForeignEvent` if the event belongs to another todo.
    pub fn apply(&mut self, event: &TodoEvent) -> Result<(), TodoError> {
        if event.todo_id() != &self.id {
            return Err(TodoError::ForeignEvent {
                todo: self.id.clone(),
                event: event.todo_id().clone(),
            });
        }
        self.mutate(event);
        self.version += 1;
        Ok(())
    }

    fn record(&mut self, event: TodoEvent) {
        self.mutate(&event);
        tracing::debug!(
            todo_id = %self.id,
            event_type = event.event_type(),
            "todo event recorded"
        );
        self.changes.push(event);
    }

    fn mutate(&mut self, event: &TodoEvent) {
        match event {
            TodoEvent::TodoAdded(e) => {
                self.added = true;
                self.details = e.details.clone();
            }
            TodoEvent::TodoAmended(e) => {
                self.details = std::mem::take(&mut self.details).amend(e.details.clone());
            }
            TodoEvent::TodoCompleted(e) => self.completed_on = Some(e.completed_on),
            TodoEvent::TodoAbandoned(e) => self.abandoned_on = Some(e.abandoned_on),
            TodoEvent::StakeholderNotifiedOfTodoCompletion(_) => {}
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    #[must_use]
    pub const fn id(&self) -> &TodoId {
        &self.id
    }

    /// Current details; empty until added.
    #[must_use]
    pub const fn details(&self) -> &TodoDetails {
        &self.details
    }

    #[must_use]
    pub const fn completed_on(&self) -> Option<NaiveDate> {
        self.completed_on
    }

    #[must_use]
    pub const fn abandoned_on(&self) -> Option<NaiveDate> {
        self.abandoned_on
    }

    /// Number of committed events: replayed, or taken via [`Self::take_changes`].
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Events recorded since load, not yet committed.
    #[must_use]
    pub fn changes(&self) -> &[TodoEvent] {
        &self.changes
    }

    /// Hand uncommitted events to the store and count them as committed.
    pub fn take_changes(&mut self) -> Vec<TodoEvent> {
        let changes = std::mem::take(&mut self.changes);
        self.version += changes.len() as u64;
        changes
    }
}
