//! Task records: identifiers, enumerations, the decoded [`Task`], and the
//! [`TaskDraft`] a caller fills in before creation.
//!
//! Stored layout (`tasks/{taskId}`):
//! `{title, description, assignedTo, assignedToName, createdBy,
//! createdByName, status, priority, createdAt, dueDate}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseEnumError;
use crate::record::{Decoded, Document, FieldReader, WriteFields};

/// Stored field names for task records.
pub mod fields {
    /// Display title.
    pub const TITLE: &str = "title";
    /// Free-text description.
    pub const DESCRIPTION: &str = "description";
    /// Identity of the responsible actor.
    pub const ASSIGNED_TO: &str = "assignedTo";
    /// Display name of the responsible actor.
    pub const ASSIGNED_TO_NAME: &str = "assignedToName";
    /// Identity of the creating actor (write-once).
    pub const CREATED_BY: &str = "createdBy";
    /// Display name of the creating actor (write-once).
    pub const CREATED_BY_NAME: &str = "createdByName";
    /// One of `pending`, `inProgress`, `completed`.
    pub const STATUS: &str = "status";
    /// One of `low`, `medium`, `high`.
    pub const PRIORITY: &str = "priority";
    /// Server-assigned creation time, epoch milliseconds (write-once).
    pub const CREATED_AT: &str = "createdAt";
    /// Client-supplied deadline, epoch milliseconds.
    pub const DUE_DATE: &str = "dueDate";
}

/// Store-assigned task identifier. Opaque and stable for the task's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps a store-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Workflow status of a task.
///
/// Any status may move to any other, including re-opening a completed task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    /// Not started. Every task starts here.
    #[default]
    Pending,
    /// Being worked on.
    InProgress,
    /// Done. Not terminal.
    Completed,
}

impl TaskStatus {
    /// All statuses, in workflow order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Completed];

    /// The stored string for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "inProgress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("status", s))
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low.
    Low,
    /// Medium. The default.
    #[default]
    Medium,
    /// High.
    High,
}

impl Priority {
    /// All priorities, lowest first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// The stored string for this priority.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parses a priority as a person typed or picked it, ignoring case.
    ///
    /// Stored records go through [`FromStr`], which accepts only the stored
    /// lowercase strings.
    ///
    /// # Errors
    ///
    /// Returns [`ParseEnumError`] if `label` names no priority.
    pub fn from_label(label: &str) -> Result<Self, ParseEnumError> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(label.trim()))
            .ok_or_else(|| ParseEnumError::new("priority", label))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("priority", s))
    }
}

/// A task as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned identifier.
    pub id: TaskId,
    /// Display title.
    pub title: String,
    /// Free text, empty by default.
    pub description: String,
    /// Identity of the responsible actor.
    pub assigned_to: String,
    /// Display name of the responsible actor.
    pub assigned_to_name: String,
    /// Identity of the creating actor.
    pub created_by: String,
    /// Display name of the creating actor.
    pub created_by_name: String,
    /// Workflow status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: Priority,
    /// Server-assigned creation time, epoch milliseconds.
    pub created_at: u64,
    /// Deadline, epoch milliseconds.
    pub due_date: u64,
}

impl Task {
    /// Decodes a stored task record.
    ///
    /// Never fails. Missing or mistyped fields take the defaults (empty
    /// strings, `0` timestamps, [`TaskStatus::Pending`], [`Priority::Medium`])
    /// and are listed in the returned fallback report.
    #[must_use]
    pub fn from_document(id: TaskId, doc: &Document) -> Decoded<Self> {
        let mut reader = FieldReader::new(doc);
        let task = Self {
            id,
            title: reader.string(fields::TITLE, ""),
            description: reader.string(fields::DESCRIPTION, ""),
            assigned_to: reader.string(fields::ASSIGNED_TO, ""),
            assigned_to_name: reader.string(fields::ASSIGNED_TO_NAME, ""),
            created_by: reader.string(fields::CREATED_BY, ""),
            created_by_name: reader.string(fields::CREATED_BY_NAME, ""),
            status: reader.parsed(fields::STATUS),
            priority: reader.parsed(fields::PRIORITY),
            created_at: reader.millis(fields::CREATED_AT),
            due_date: reader.millis(fields::DUE_DATE),
        };
        reader.finish(task)
    }

    /// Returns `true` if the deadline has passed and the task is not done.
    #[must_use]
    pub fn is_overdue(&self, now_ms: u64) -> bool {
        self.due_date < now_ms && self.status != TaskStatus::Completed
    }
}

/// Who a draft is assigned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignee {
    /// Identity of the assignee.
    pub id: String,
    /// Display name of the assignee.
    pub name: String,
}

/// The caller-supplied part of a new task.
///
/// Creation stamps everything else: the creator, the server creation time,
/// and the initial [`TaskStatus::Pending`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    /// Display title. Must not be blank.
    pub title: String,
    /// Free text.
    pub description: String,
    /// Responsible actor; the creator when `None`.
    pub assignee: Option<Assignee>,
    /// Priority.
    pub priority: Priority,
    /// Deadline, epoch milliseconds.
    pub due_date: u64,
}

impl TaskDraft {
    /// Starts a draft with the given title and defaults for everything else.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Assigns the task to someone other than the creator.
    #[must_use]
    pub fn assigned_to(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.assignee = Some(Assignee {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub const fn due_at(mut self, due_date_ms: u64) -> Self {
        self.due_date = due_date_ms;
        self
    }

    /// Returns `true` if the title is empty or whitespace only.
    #[must_use]
    pub fn has_blank_title(&self) -> bool {
        self.title.trim().is_empty()
    }

    /// Builds the insert for this draft on behalf of `creator_id`.
    ///
    /// `createdAt` is left to the store's clock.
    #[must_use]
    pub fn creation_fields(&self, creator_id: &str, creator_name: &str) -> WriteFields {
        let (assigned_to, assigned_to_name) = self
            .assignee
            .as_ref()
            .map_or((creator_id, creator_name), |a| (a.id.as_str(), a.name.as_str()));

        WriteFields::new()
            .set(fields::TITLE, self.title.as_str())
            .set(fields::DESCRIPTION, self.description.as_str())
            .set(fields::ASSIGNED_TO, assigned_to)
            .set(fields::ASSIGNED_TO_NAME, assigned_to_name)
            .set(fields::CREATED_BY, creator_id)
            .set(fields::CREATED_BY_NAME, creator_name)
            .set(fields::STATUS, TaskStatus::Pending.as_str())
            .set(fields::PRIORITY, self.priority.as_str())
            .server_timestamp(fields::CREATED_AT)
            .set(fields::DUE_DATE, self.due_date)
    }
}

/// The partial update that changes only a task's status.
#[must_use]
pub fn status_fields(status: TaskStatus) -> WriteFields {
    WriteFields::new().set(fields::STATUS, status.as_str())
}
