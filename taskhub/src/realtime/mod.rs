//! Realtime key-value tree abstraction.
//!
//! The realtime tree is a low-latency broadcast store: values live at
//! slash-separated paths, and a watcher attached to a parent path is told
//! whenever one of its direct children is added, changed or removed.
//! Update notices and session presence both ride on it.

pub mod memory;

pub use memory::{InMemoryRealtime, RealtimeHub};

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use taskhub_proto::WriteFields;
use tokio::sync::mpsc;

/// What happened to a child of a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildEventKind {
    /// The child did not exist before. Also used to replay existing
    /// children when a watch is attached.
    Added,
    /// An existing child was overwritten with a different value.
    Changed,
    /// The child was removed.
    Removed,
}

/// One change to a direct child of a watched path.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildEvent {
    /// What happened.
    pub kind: ChildEventKind,
    /// Key of the child under the watched path.
    pub key: String,
    /// The child's new value (the old value for [`ChildEventKind::Removed`]).
    pub value: Value,
}

/// Events that did not fit in a watcher's channel, at most one per key.
///
/// Once anything is held here, newer events for the watcher queue behind it
/// so delivery order per key is kept.
#[derive(Debug, Default)]
pub struct Overflow {
    events: VecDeque<ChildEvent>,
}

impl Overflow {
    /// Returns `true` if nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of keys with a held event.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Holds `event`, folding it into the pending event for the same key.
    ///
    /// The newer event wins, except that a removal followed by a re-add is
    /// reported as a change.
    pub fn push(&mut self, event: ChildEvent) {
        let Some(slot) = self.events.iter_mut().find(|held| held.key == event.key) else {
            self.events.push_back(event);
            return;
        };
        slot.kind = match (slot.kind, event.kind) {
            (ChildEventKind::Removed, ChildEventKind::Added) => ChildEventKind::Changed,
            (_, kind) => kind,
        };
        slot.value = event.value;
    }

    /// Takes the oldest held event.
    pub fn pop(&mut self) -> Option<ChildEvent> {
        self.events.pop_front()
    }
}

/// Receiving side of a child watch.
///
/// Dropping or [closing](ChildEvents::close) it detaches the watch.
#[derive(Debug)]
pub struct ChildEvents {
    rx: mpsc::Receiver<ChildEvent>,
    overflow: Arc<Mutex<Overflow>>,
}

impl ChildEvents {
    /// Wraps the receiving end of a watcher channel and its overflow.
    #[must_use]
    pub const fn new(rx: mpsc::Receiver<ChildEvent>, overflow: Arc<Mutex<Overflow>>) -> Self {
        Self { rx, overflow }
    }

    /// Waits for the next event. Returns `None` once the watch has ended
    /// and everything queued has been taken.
    pub async fn recv(&mut self) -> Option<ChildEvent> {
        if let Some(event) = self.try_recv() {
            return Some(event);
        }
        // Overflow only fills while the channel is full, so an empty channel
        // and an empty overflow mean the next event arrives on the channel.
        self.rx.recv().await
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<ChildEvent> {
        let mut overflow = self.overflow.lock();
        self.rx.try_recv().ok().or_else(|| overflow.pop())
    }

    /// Stops the watch. Already-queued events can still be drained.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Errors surfaced by a realtime transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RealtimeError {
    /// The session's connection has ended.
    #[error("realtime connection closed")]
    Disconnected,

    /// The path is not of the form `parent/key`.
    #[error("invalid realtime path: {0:?}")]
    InvalidPath(String),
}

/// Async realtime tree connection for one session.
pub trait RealtimeTransport: Send + Sync {
    /// Overwrites the value at `path`.
    ///
    /// Server timestamps in `fields` are stamped by the backend's clock.
    fn set_value(
        &self,
        path: &str,
        fields: WriteFields,
    ) -> impl std::future::Future<Output = Result<(), RealtimeError>> + Send;

    /// Watches the direct children of `path`.
    ///
    /// Children that already exist are delivered first as
    /// [`ChildEventKind::Added`]. `buffer` bounds the number of undelivered
    /// live events kept verbatim; past it, events are coalesced so that only
    /// the latest event per key is pending.
    fn watch_children(
        &self,
        path: &str,
        buffer: usize,
    ) -> impl std::future::Future<Output = Result<ChildEvents, RealtimeError>> + Send;

    /// Registers a write the backend performs when this session's
    /// connection ends, gracefully or not.
    fn on_disconnect_set_value(
        &self,
        path: &str,
        fields: WriteFields,
    ) -> impl std::future::Future<Output = Result<(), RealtimeError>> + Send;
}

/// Splits `parent/key` into its parts.
///
/// # Errors
///
/// Returns [`RealtimeError::InvalidPath`] if either part is empty.
pub fn split_path(path: &str) -> Result<(&str, &str), RealtimeError> {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some((parent, key)) if !parent.is_empty() && !key.is_empty() => Ok((parent, key)),
        _ => Err(RealtimeError::InvalidPath(path.to_string())),
    }
}
