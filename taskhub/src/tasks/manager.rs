//! Task manager: CRUD against the document store plus notice publishing.
//!
//! There is no local cache. Every read goes to the store, so a list issued
//! right after a write may not include it yet; callers re-list after each
//! mutation instead.

use std::sync::Arc;

use taskhub_proto::layout::TASKS_COLLECTION;
use taskhub_proto::notice::UNKNOWN_ACTOR;
use taskhub_proto::task::{fields, status_fields};
use taskhub_proto::{Task, TaskDraft, TaskId, TaskStatus};

use super::TaskError;
use crate::identity::{Actor, IdentityGateway};
use crate::notify::{NotificationChannel, Subscription, SubscriptionHandle, TaskChange};
use crate::realtime::{RealtimeError, RealtimeTransport};
use crate::store::{DocumentStore, OrderBy, StoreError, StoredDocument};

/// Mediates every task mutation and read for one session.
///
/// All collaborators are injected; nothing is reached through globals.
/// Concurrent writers are not coordinated: two sessions updating the same
/// task leave whichever write the store applied last.
pub struct TaskManager<I, S, R> {
    identity: Arc<I>,
    store: Arc<S>,
    notices: NotificationChannel<R>,
    collection: String,
}

impl<I, S, R> TaskManager<I, S, R>
where
    I: IdentityGateway,
    S: DocumentStore,
    R: RealtimeTransport,
{
    /// Creates a manager over the default `tasks` collection.
    #[must_use]
    pub fn new(identity: Arc<I>, store: Arc<S>, notices: NotificationChannel<R>) -> Self {
        Self {
            identity,
            store,
            notices,
            collection: TASKS_COLLECTION.to_string(),
        }
    }

    /// Uses `collection` instead of `tasks`.
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// The session's signed-in actor, if any.
    ///
    /// Use [`Actor::name`] for the display name with fallbacks applied.
    #[must_use]
    pub fn current_actor(&self) -> Option<Actor> {
        self.identity.current_user()
    }

    /// The notification channel this manager publishes on.
    #[must_use]
    pub const fn notices(&self) -> &NotificationChannel<R> {
        &self.notices
    }

    /// Creates a task from `draft` and returns its store-assigned id.
    ///
    /// The creator is stamped from the signed-in actor and `createdAt` from
    /// the store's clock. An unassigned draft is assigned to its creator.
    /// A notice is published for the new id.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Unauthenticated`] with nobody signed in,
    /// [`TaskError::TitleBlank`] for an empty or whitespace title, and
    /// [`TaskError::Store`] if the insert fails.
    pub async fn create_task(&self, draft: &TaskDraft) -> Result<TaskId, TaskError> {
        let actor = self.identity.current_user().ok_or(TaskError::Unauthenticated)?;
        if draft.has_blank_title() {
            return Err(TaskError::TitleBlank);
        }

        let actor_name = actor.name();
        let id = self
            .store
            .insert(&self.collection, draft.creation_fields(&actor.id, &actor_name))
            .await?;
        let task_id = TaskId::new(id);
        tracing::info!(task_id = %task_id, created_by = %actor.id, "task created");

        self.notices.publish(&task_id, &actor.id, &actor_name).await;
        Ok(task_id)
    }

    /// Lists every task, newest first.
    ///
    /// Fields that are missing or unusable in storage are replaced by their
    /// defaults; malformed ones are logged.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the query fails.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, TaskError> {
        let docs = self
            .store
            .query_all(&self.collection, Some(OrderBy::descending(fields::CREATED_AT)))
            .await?;
        Ok(docs.iter().map(decode_task).collect())
    }

    /// Reads one task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the read fails.
    pub async fn get_task(&self, task_id: &TaskId) -> Result<Option<Task>, TaskError> {
        let doc = self.store.get(&self.collection, task_id.as_str()).await?;
        Ok(doc.as_ref().map(decode_task))
    }

    /// Sets a task's status, leaving every other field untouched, then
    /// publishes a notice.
    ///
    /// Any status may move to any other. Without a signed-in actor the
    /// notice is attributed to `"unknown"`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if the task does not exist and
    /// [`TaskError::Store`] for other store failures.
    pub async fn update_status(&self, task_id: &TaskId, status: TaskStatus) -> Result<(), TaskError> {
        self.store
            .update_fields(&self.collection, task_id.as_str(), status_fields(status))
            .await
            .map_err(|err| match err {
                StoreError::NotFound { .. } => TaskError::NotFound(task_id.clone()),
                other => TaskError::Store(other),
            })?;
        tracing::info!(task_id = %task_id, status = %status, "task status updated");

        let (actor_id, actor_name) = self.identity.current_user().map_or_else(
            || (UNKNOWN_ACTOR.to_string(), UNKNOWN_ACTOR.to_string()),
            |actor| {
                let name = actor.name();
                (actor.id, name)
            },
        );
        self.notices.publish(task_id, &actor_id, &actor_name).await;
        Ok(())
    }

    /// Deletes a task.
    ///
    /// No notice is published; other sessions see the deletion on their
    /// next re-list. Deleting a missing task succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the delete fails.
    pub async fn delete_task(&self, task_id: &TaskId) -> Result<(), TaskError> {
        self.store.delete(&self.collection, task_id.as_str()).await?;
        tracing::info!(task_id = %task_id, "task deleted");
        Ok(())
    }

    /// Subscribes to changes of existing tasks.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError`] if the watch cannot be attached.
    pub async fn subscribe(&self) -> Result<Subscription, RealtimeError> {
        self.notices.subscribe().await
    }

    /// Subscribes to changes of existing tasks with a callback.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError`] if the watch cannot be attached.
    pub async fn subscribe_with<F>(&self, on_change: F) -> Result<SubscriptionHandle, RealtimeError>
    where
        F: FnMut(TaskChange) + Send + 'static,
    {
        self.notices.subscribe_with(on_change).await
    }
}

fn decode_task(doc: &StoredDocument) -> Task {
    let decoded = Task::from_document(TaskId::new(doc.id.clone()), &doc.fields);
    for fallback in decoded.malformed() {
        tracing::warn!(
            task_id = %decoded.value.id,
            field = fallback.field,
            reason = ?fallback.reason,
            "malformed task field replaced by default"
        );
    }
    decoded.into_value()
}
