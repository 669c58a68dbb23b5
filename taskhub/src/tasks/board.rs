//! Task board: the consumer-side view of the task list.
//!
//! The board never patches its snapshot from notices or local writes,
//! except for the optimistic status change. Anything else comes from a
//! fresh [`TaskManager::list_tasks`].

use std::sync::Arc;

use taskhub_proto::{Task, TaskDraft, TaskId, TaskStatus};

use super::{TaskError, TaskManager};
use crate::identity::IdentityGateway;
use crate::notify::TaskChange;
use crate::realtime::RealtimeTransport;
use crate::store::DocumentStore;

/// Last-listed snapshot of all tasks plus the mutations that keep it fresh.
pub struct TaskBoard<I, S, R> {
    manager: Arc<TaskManager<I, S, R>>,
    tasks: Vec<Task>,
}

impl<I, S, R> TaskBoard<I, S, R>
where
    I: IdentityGateway,
    S: DocumentStore,
    R: RealtimeTransport,
{
    /// Creates an empty board. Call [`refresh`](Self::refresh) to load it.
    #[must_use]
    pub const fn new(manager: Arc<TaskManager<I, S, R>>) -> Self {
        Self {
            manager,
            tasks: Vec::new(),
        }
    }

    /// The current snapshot, newest first.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Looks up a task in the snapshot.
    #[must_use]
    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == task_id)
    }

    /// Number of snapshot tasks overdue at `now_ms`.
    #[must_use]
    pub fn overdue_count(&self, now_ms: u64) -> usize {
        self.tasks.iter().filter(|task| task.is_overdue(now_ms)).count()
    }

    /// Replaces the snapshot with a fresh listing.
    ///
    /// # Errors
    ///
    /// Returns the listing error; the snapshot is left unchanged.
    pub async fn refresh(&mut self) -> Result<(), TaskError> {
        self.tasks = self.manager.list_tasks().await?;
        Ok(())
    }

    /// Creates a task and re-lists.
    ///
    /// # Errors
    ///
    /// Returns the creation error with the snapshot unchanged, or the
    /// re-list error after a successful create.
    pub async fn create(&mut self, draft: &TaskDraft) -> Result<TaskId, TaskError> {
        let task_id = self.manager.create_task(draft).await?;
        self.refresh().await?;
        Ok(task_id)
    }

    /// Shows the new status immediately, then writes it.
    ///
    /// If the write fails the board re-lists so the snapshot matches the
    /// store again, and the write error is returned.
    ///
    /// # Errors
    ///
    /// Returns the [`TaskManager::update_status`] error.
    pub async fn set_status(&mut self, task_id: &TaskId, status: TaskStatus) -> Result<(), TaskError> {
        if let Some(task) = self.tasks.iter_mut().find(|task| &task.id == task_id) {
            task.status = status;
        }

        if let Err(err) = self.manager.update_status(task_id, status).await {
            tracing::warn!(task_id = %task_id, error = %err, "status update failed, re-syncing board");
            if let Err(refresh_err) = self.refresh().await {
                tracing::warn!(error = %refresh_err, "board re-sync failed");
            }
            return Err(err);
        }
        Ok(())
    }

    /// Deletes a task and re-lists.
    ///
    /// # Errors
    ///
    /// Returns the delete error with the snapshot unchanged, or the re-list
    /// error after a successful delete.
    pub async fn delete(&mut self, task_id: &TaskId) -> Result<(), TaskError> {
        self.manager.delete_task(task_id).await?;
        self.refresh().await
    }

    /// Reacts to a change notice by re-listing.
    ///
    /// # Errors
    ///
    /// Returns the re-list error.
    pub async fn on_change(&mut self, change: &TaskChange) -> Result<(), TaskError> {
        tracing::debug!(
            task_id = %change.notice.task_id,
            message = %change.message,
            "change notice received"
        );
        self.refresh().await
    }
}
