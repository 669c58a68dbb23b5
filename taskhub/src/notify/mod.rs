//! Update notification channel.
//!
//! Every task mutation except delete overwrites `task_updates/{taskId}`
//! with who changed it and when. Other sessions watch that path and treat
//! each change to an existing notice as a cue to re-list their tasks.
//!
//! Publishing is best-effort: a failed publish is logged and never fails
//! the mutation it followed. Subscriptions only report
//! [`ChildEventKind::Changed`] events. Notices seen for the first time
//! (including the replay of existing notices when a subscription starts)
//! and removed notices are skipped.

use std::sync::Arc;

use futures_util::Stream;
use taskhub_proto::layout::{TASK_UPDATES_PATH, child_path};
use taskhub_proto::{TaskId, UpdateNotice};
use tokio::task::JoinHandle;

use crate::realtime::{ChildEvent, ChildEventKind, ChildEvents, RealtimeError, RealtimeTransport};

/// Actor name used in change messages when a notice carries none.
pub const DEFAULT_FALLBACK_ACTOR_NAME: &str = "Someone";

/// Default bound on undelivered change events per subscription.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Settings for a [`NotificationChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Realtime path whose children are update notices.
    pub updates_path: String,
    /// Bound on undelivered events per subscription.
    pub event_buffer: usize,
    /// Name shown for notices without an actor name.
    pub fallback_actor_name: String,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            updates_path: TASK_UPDATES_PATH.to_string(),
            event_buffer: DEFAULT_EVENT_BUFFER,
            fallback_actor_name: DEFAULT_FALLBACK_ACTOR_NAME.to_string(),
        }
    }
}

/// A change to an existing task, as reported to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChange {
    /// The notice that triggered this change.
    pub notice: UpdateNotice,
    /// Human-readable summary, e.g. `"Ana updated a task"`.
    pub message: String,
}

/// Publishes and subscribes to update notices over a realtime transport.
pub struct NotificationChannel<R> {
    transport: Arc<R>,
    settings: ChannelSettings,
}

impl<R: RealtimeTransport> NotificationChannel<R> {
    /// Creates a channel over `transport`.
    #[must_use]
    pub const fn new(transport: Arc<R>, settings: ChannelSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// The channel's settings.
    #[must_use]
    pub const fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    /// Overwrites the notice for `task_id`.
    ///
    /// Never fails: transport errors are logged and dropped.
    pub async fn publish(&self, task_id: &TaskId, actor_id: &str, actor_name: &str) {
        let path = child_path(&self.settings.updates_path, task_id.as_str());
        match self
            .transport
            .set_value(&path, UpdateNotice::fields(actor_id, actor_name))
            .await
        {
            Ok(()) => tracing::debug!(task_id = %task_id, actor_id, "update notice published"),
            Err(err) => tracing::warn!(
                task_id = %task_id,
                error = %err,
                "update notice not published; mutation already applied"
            ),
        }
    }

    /// Starts a subscription to change events.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError`] if the watch cannot be attached.
    pub async fn subscribe(&self) -> Result<Subscription, RealtimeError> {
        let events = self
            .transport
            .watch_children(&self.settings.updates_path, self.settings.event_buffer)
            .await?;
        tracing::debug!(path = %self.settings.updates_path, "subscribed to update notices");
        Ok(Subscription {
            events: Some(events),
            fallback_actor_name: self.settings.fallback_actor_name.clone(),
        })
    }

    /// Starts a subscription that calls `on_change` for each change, in
    /// arrival order, on a background task.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError`] if the watch cannot be attached.
    pub async fn subscribe_with<F>(&self, mut on_change: F) -> Result<SubscriptionHandle, RealtimeError>
    where
        F: FnMut(TaskChange) + Send + 'static,
    {
        let mut subscription = self.subscribe().await?;
        let task = tokio::spawn(async move {
            while let Some(change) = subscription.next().await {
                on_change(change);
            }
        });
        Ok(SubscriptionHandle { task: Some(task) })
    }
}

/// An active watch on update notices.
///
/// Lifecycle: active from [`NotificationChannel::subscribe`] until
/// [`unsubscribe`](Self::unsubscribe), drop, or the transport ending the
/// watch. The watch belongs to the transport's session, so it ends when
/// that session does.
#[derive(Debug)]
pub struct Subscription {
    events: Option<ChildEvents>,
    fallback_actor_name: String,
}

impl Subscription {
    /// Waits for the next change to an existing notice.
    ///
    /// Returns `None` once the subscription is no longer active.
    pub async fn next(&mut self) -> Option<TaskChange> {
        loop {
            let received = match self.events.as_mut() {
                Some(events) => events.recv().await,
                None => return None,
            };
            let Some(event) = received else {
                self.events = None;
                return None;
            };
            if event.kind == ChildEventKind::Changed {
                return Some(self.to_change(event));
            }
        }
    }

    /// Stops delivery. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(mut events) = self.events.take() {
            events.close();
            tracing::debug!("unsubscribed from update notices");
        }
    }

    /// Returns `true` until the subscription has ended.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.events.is_some()
    }

    /// Turns the subscription into a stream of changes.
    pub fn into_stream(self) -> impl Stream<Item = TaskChange> + Send {
        futures_util::stream::unfold(self, |mut subscription| async move {
            let change = subscription.next().await?;
            Some((change, subscription))
        })
    }

    fn to_change(&self, event: ChildEvent) -> TaskChange {
        let decoded = UpdateNotice::from_value(TaskId::new(event.key), &event.value);
        for fallback in decoded.malformed() {
            tracing::warn!(
                task_id = %decoded.value.task_id,
                field = fallback.field,
                reason = ?fallback.reason,
                "malformed update notice field"
            );
        }
        let notice = decoded.into_value();
        let message = format!(
            "{} updated a task",
            notice.actor_name_or(&self.fallback_actor_name)
        );
        TaskChange { notice, message }
    }
}

/// Owner of a callback subscription started with
/// [`NotificationChannel::subscribe_with`].
///
/// Dropping the handle also unsubscribes.
#[derive(Debug)]
pub struct SubscriptionHandle {
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Stops delivery. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Returns `true` while callbacks may still be delivered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
