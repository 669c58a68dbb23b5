//! Default collection and path names.
//!
//! ```text
//! users/{userId}          {name, email, createdAt}
//! tasks/{taskId}          {title, description, assignedTo, assignedToName,
//!                          createdBy, createdByName, status, priority,
//!                          createdAt, dueDate}
//! task_updates/{taskId}   {lastUpdate, updatedBy, updatedByName}
//! presence/{userId}       {status, lastSeen, userName}
//! ```

/// Document collection holding task records.
pub const TASKS_COLLECTION: &str = "tasks";

/// Document collection holding user profiles.
pub const USERS_COLLECTION: &str = "users";

/// Realtime path whose children are update notices.
pub const TASK_UPDATES_PATH: &str = "task_updates";

/// Realtime path whose children are presence records.
pub const PRESENCE_PATH: &str = "presence";

/// Joins a parent path and a child key.
#[must_use]
pub fn child_path(parent: &str, key: &str) -> String {
    format!("{}/{key}", parent.trim_end_matches('/'))
}
