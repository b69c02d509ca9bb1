//! Payloads for the synchronized entity kinds.
//!
//! Only the fields needed by reconciliation are modelled. Adapters map
//! their native representation onto these structs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of entity a synchronization profile works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Event,
    Contact,
    Task,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event => write!(f, "event"),
            Self::Contact => write!(f, "contact"),
            Self::Task => write!(f, "task"),
        }
    }
}

/// A calendar appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl EventData {
    /// Creates an event with no location or body.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, subject: impl Into<String>) -> Self {
        Self {
            start,
            end,
            subject: subject.into(),
            location: None,
            body: None,
        }
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the body text.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// An address book entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactData {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ContactData {
    /// Creates a contact with only a display name.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            primary_email: None,
            primary_phone: None,
            notes: None,
        }
    }

    /// Sets the primary email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.primary_email = Some(email.into());
        self
    }

    /// Sets the primary phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.primary_phone = Some(phone.into());
        self
    }
}

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskData {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl TaskData {
    /// Creates an open task with no due date.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            due: None,
            completed: false,
            body: None,
        }
    }

    /// Sets the due date.
    #[must_use]
    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }

    /// Marks the task as completed.
    #[must_use]
    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }
}
