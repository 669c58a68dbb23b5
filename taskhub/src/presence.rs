//! Session presence.
//!
//! Presence is advisory: failures are logged and never surfaced.

use std::sync::Arc;

use taskhub_proto::layout::{PRESENCE_PATH, child_path};
use taskhub_proto::{PresenceRecord, PresenceStatus};

use crate::identity::Actor;
use crate::realtime::RealtimeTransport;

/// Advertises a session's actor as online until the session ends.
pub struct PresenceTracker<R> {
    transport: Arc<R>,
    path: String,
}

impl<R: RealtimeTransport> PresenceTracker<R> {
    /// Creates a tracker writing under `presence_path`.
    pub fn new(transport: Arc<R>, presence_path: impl Into<String>) -> Self {
        Self {
            transport,
            path: presence_path.into(),
        }
    }

    /// Creates a tracker writing under the default `presence` path.
    #[must_use]
    pub fn with_default_path(transport: Arc<R>) -> Self {
        Self::new(transport, PRESENCE_PATH)
    }

    /// Marks `actor` online and arranges for an offline mark when the
    /// connection ends.
    ///
    /// The offline write is registered before the online one so that a
    /// connection lost in between still ends offline.
    pub async fn announce(&self, actor: &Actor) {
        let path = child_path(&self.path, &actor.id);
        let name = actor.name();

        if let Err(err) = self
            .transport
            .on_disconnect_set_value(&path, PresenceRecord::fields(PresenceStatus::Offline, &name))
            .await
        {
            tracing::warn!(user_id = %actor.id, error = %err, "offline presence not registered");
        }
        match self
            .transport
            .set_value(&path, PresenceRecord::fields(PresenceStatus::Online, &name))
            .await
        {
            Ok(()) => tracing::debug!(user_id = %actor.id, "presence announced"),
            Err(err) => tracing::warn!(user_id = %actor.id, error = %err, "presence not announced"),
        }
    }
}
