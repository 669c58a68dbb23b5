//! Record layout and data model for `TaskHub`.
//!
//! Everything here is storage-agnostic: records are read from and written
//! to schemaless JSON documents, and decoding never fails a whole record
//! because of one bad field.

pub mod layout;
pub mod notice;
pub mod presence;
pub mod record;
pub mod task;
pub mod user;

pub use notice::UpdateNotice;
pub use presence::{PresenceRecord, PresenceStatus};
pub use record::{Decoded, Document, FallbackReason, FieldFallback, FieldValue, WriteFields};
pub use task::{Assignee, Priority, Task, TaskDraft, TaskId, TaskStatus};
pub use user::User;

/// A string that is not a member of an enumerated field's value set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    /// Creates an error for `value` not being a valid `kind`.
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// The rejected input.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}
