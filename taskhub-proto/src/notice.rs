//! Update notices (`task_updates/{taskId}`:
//! `{lastUpdate, updatedBy, updatedByName}`).
//!
//! A notice signals that a task changed without carrying the change itself.
//! There is one notice per task id; each publish overwrites the previous one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{Decoded, FieldReader, WriteFields, as_document};
use crate::task::TaskId;

/// Stored field names for update notices.
pub mod fields {
    /// Server time of the most recent change, epoch milliseconds.
    pub const LAST_UPDATE: &str = "lastUpdate";
    /// Identity of the actor behind the change.
    pub const UPDATED_BY: &str = "updatedBy";
    /// Display name of the actor behind the change.
    pub const UPDATED_BY_NAME: &str = "updatedByName";
}

/// Placeholder written when the publishing session has no actor.
pub const UNKNOWN_ACTOR: &str = "unknown";

/// The latest change signal for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotice {
    /// Task the notice is keyed by.
    pub task_id: TaskId,
    /// Server time of the change.
    pub last_update: u64,
    /// Identity of the actor.
    pub updated_by: String,
    /// Display name of the actor, if the notice carried a usable one.
    pub updated_by_name: Option<String>,
}

impl UpdateNotice {
    /// Builds the overwrite for a notice; `lastUpdate` is server-stamped.
    #[must_use]
    pub fn fields(actor_id: &str, actor_name: &str) -> WriteFields {
        WriteFields::new()
            .server_timestamp(fields::LAST_UPDATE)
            .set(fields::UPDATED_BY, actor_id)
            .set(fields::UPDATED_BY_NAME, actor_name)
    }

    /// Decodes a notice value read from the realtime tree.
    #[must_use]
    pub fn from_value(task_id: TaskId, value: &Value) -> Decoded<Self> {
        let doc = as_document(value);
        let mut reader = FieldReader::new(&doc);
        let notice = Self {
            task_id,
            last_update: reader.millis(fields::LAST_UPDATE),
            updated_by: reader.string(fields::UPDATED_BY, UNKNOWN_ACTOR),
            updated_by_name: reader.optional_string(fields::UPDATED_BY_NAME),
        };
        reader.finish(notice)
    }

    /// The actor's display name, or `fallback`.
    #[must_use]
    pub fn actor_name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.updated_by_name.as_deref().unwrap_or(fallback)
    }
}
