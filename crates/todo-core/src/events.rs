//! Todo domain events.
//!
//! Events are facts: replaying them never re-checks invariants. Each event
//! names the todo it belongs to, and the aggregate rejects events for any
//! other todo.
//!
//! # Usage
//!
//! ```rust
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use todo_core::{events::serialize_event, TodoDetails, TodoEvent, TodoId};
//!
//! let event = TodoEvent::added(TodoId::parse("todo-1")?, TodoDetails::new("Buy milk"));
//! assert_eq!(event.event_type(), "todo_added");
//! assert!(serialize_event(&event)?.contains("\"event_type\":\"TodoAdded\""));
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::TodoId;

// ============================================================================
// Domain Event Enum
// ============================================================================

/// Something that happened to a todo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data")]
pub enum TodoEvent {
    /// The todo was added
    TodoAdded(TodoAddedEvent),

    /// Some details were changed
    TodoAmended(TodoAmendedEvent),

    /// The todo was completed
    TodoCompleted(TodoCompletedEvent),

    /// The todo was abandoned
    TodoAbandoned(TodoAbandonedEvent),

    /// The stakeholder heard about the completion; changes no state
    StakeholderNotifiedOfTodoCompletion(StakeholderNotifiedEvent),
}

impl TodoEvent {
    #[must_use]
    pub const fn added(todo_id: TodoId, details: TodoDetails) -> Self {
        Self::TodoAdded(TodoAddedEvent { todo_id, details })
    }

    #[must_use]
    pub const fn amended(todo_id: TodoId, details: TodoDetails) -> Self {
        Self::TodoAmended(TodoAmendedEvent { todo_id, details })
    }

    #[must_use]
    pub const fn completed(todo_id: TodoId, completed_on: NaiveDate) -> Self {
        Self::TodoCompleted(TodoCompletedEvent {
            todo_id,
            completed_on,
        })
    }

    #[must_use]
    pub const fn abandoned(todo_id: TodoId, abandoned_on: NaiveDate) -> Self {
        Self::TodoAbandoned(TodoAbandonedEvent {
            todo_id,
            abandoned_on,
        })
    }

    #[must_use]
    pub const fn stakeholder_notified(todo_id: TodoId, notified_on: NaiveDate) -> Self {
        Self::StakeholderNotifiedOfTodoCompletion(StakeholderNotifiedEvent {
            todo_id,
            notified_on,
        })
    }

    /// The todo this event belongs to
    #[must_use]
    pub const fn todo_id(&self) -> &TodoId {
        match self {
            Self::TodoAdded(e) => &e.todo_id,
            Self::TodoAmended(e) => &e.todo_id,
            Self::TodoCompleted(e) => &e.todo_id,
            Self::TodoAbandoned(e) => &e.todo_id,
            Self::StakeholderNotifiedOfTodoCompletion(e) => &e.todo_id,
        }
    }

    /// Get the event type as a string
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::TodoAdded(_) => "todo_added",
            Self::TodoAmended(_) => "todo_amended",
            Self::TodoCompleted(_) => "todo_completed",
            Self::TodoAbandoned(_) => "todo_abandoned",
            Self::StakeholderNotifiedOfTodoCompletion(_) => {
                "stakeholder_notified_of_todo_completion"
            }
        }
    }
}

// ============================================================================
// Event Payloads
// ============================================================================

/// Descriptive fields of a todo.
///
/// On `TodoAmended` only the fields that are set replace the current ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stakeholder_email: Option<String>,
}

impl TodoDetails {
    /// Details with just a title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    #[must_use]
    pub fn with_stakeholder_email(mut self, email: impl Into<String>) -> Self {
        self.stakeholder_email = Some(email.into());
        self
    }

    /// Overlay the fields set in `amendment`.
    #[must_use]
    pub fn amend(self, amendment: Self) -> Self {
        Self {
            title: amendment.title.or(self.title),
            description: amendment.description.or(self.description),
            due_date: amendment.due_date.or(self.due_date),
            stakeholder_email: amendment.stakeholder_email.or(self.stakeholder_email),
        }
    }
}

/// Event emitted when a todo is added
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoAddedEvent {
    pub todo_id: TodoId,
    #[serde(flatten)]
    pub details: TodoDetails,
}

/// Event emitted when a todo is amended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoAmendedEvent {
    pub todo_id: TodoId,
    #[serde(flatten)]
    pub details: TodoDetails,
}

/// Event emitted when a todo is completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoCompletedEvent {
    pub todo_id: TodoId,
    pub completed_on: NaiveDate,
}

/// Event emitted when a todo is abandoned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoAbandonedEvent {
    pub todo_id: TodoId,
    pub abandoned_on: NaiveDate,
}

/// Event emitted once the stakeholder was told about a completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeholderNotifiedEvent {
    pub todo_id: TodoId,
    pub notified_on: NaiveDate,
}

// ============================================================================
// Event Metadata
// ============================================================================

/// Metadata for an event in the event store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique identifier for this event in the store
    pub event_number: i64,
    /// Stream identifier (the todo id)
    pub stream_id: String,
    /// Stream version (incrementing counter)
    pub stream_version: i64,
    /// When the event was stored
    pub stored_at: DateTime<Utc>,
}

/// A stored event with metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event: TodoEvent,
    pub metadata: EventMetadata,
}

impl StoredEvent {
    #[must_use]
    pub const fn new(event: TodoEvent, metadata: EventMetadata) -> Self {
        Self { event, metadata }
    }

    #[must_use]
    pub const fn event_number(&self) -> i64 {
        self.metadata.event_number
    }

    #[must_use]
    pub fn stream_id(&self) -> &str {
        &self.metadata.stream_id
    }

    #[must_use]
    pub const fn stream_version(&self) -> i64 {
        self.metadata.stream_version
    }
}

// ============================================================================
// Event Serialization
// ============================================================================

/// Serialize an event to JSON
///
/// # Errors
///
/// Returns an error if serialization fails
pub fn serialize_event(event: &TodoEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Deserialize an event from JSON
///
/// # Errors
///
/// Returns an error if the JSON is malformed or carries an invalid todo id
pub fn deserialize_event(json: &str) -> Result<TodoEvent, serde_json::Error> {
    serde_json::from_str(json)
}
