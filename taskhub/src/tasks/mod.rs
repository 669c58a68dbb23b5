//! Task synchronization core.
//!
//! [`TaskManager`] is the single mediator for task reads and writes and the
//! only publisher of update notices. [`TaskBoard`] is the consumer side: a
//! snapshot of the task list kept fresh by re-listing after mutations and
//! change notices.

pub mod board;
pub mod manager;

pub use board::TaskBoard;
pub use manager::TaskManager;

use taskhub_proto::TaskId;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during task operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// No actor is signed in.
    #[error("not authenticated")]
    Unauthenticated,
    /// Task title is empty or whitespace.
    #[error("task title cannot be blank")]
    TitleBlank,
    /// Task with the given ID was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The document store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
