//! In-process realtime tree.
//!
//! A [`RealtimeHub`] is the shared tree; [`RealtimeHub::connect`] opens an
//! [`InMemoryRealtime`] session against it. Watchers are bounded channels
//! fed with `try_send`. Events that do not fit are held in the watcher's
//! [`Overflow`], coalesced per key, so a slow watcher sees fewer events but
//! never stalls writers and never misses the latest value of a key. Closed
//! watchers are pruned the next time their parent path is written.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use taskhub_proto::WriteFields;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::{
    ChildEvent, ChildEventKind, ChildEvents, Overflow, RealtimeError, RealtimeTransport, split_path,
};
use crate::clock::Clock;

struct Watcher {
    session: Uuid,
    parent: String,
    tx: mpsc::Sender<ChildEvent>,
    overflow: Arc<Mutex<Overflow>>,
}

impl Watcher {
    /// Queues `event`. Returns `false` once the receiver is gone.
    fn deliver(&self, event: ChildEvent) -> bool {
        let mut overflow = self.overflow.lock();
        if !overflow.is_empty() {
            if self.tx.is_closed() {
                return false;
            }
            overflow.push(event);
            return true;
        }
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::debug!(
                    parent = %self.parent,
                    key = %event.key,
                    "watcher buffer full, coalescing child events"
                );
                overflow.push(event);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[derive(Default)]
struct HubState {
    /// Full path to value.
    values: BTreeMap<String, Value>,
    watchers: Vec<Watcher>,
    on_disconnect: HashMap<Uuid, Vec<(String, WriteFields)>>,
}

impl HubState {
    fn write(&mut self, path: &str, value: Value) -> Result<(), RealtimeError> {
        let (parent, key) = split_path(path)?;
        let full = format!("{parent}/{key}");
        let kind = match self.values.insert(full, value.clone()) {
            None => ChildEventKind::Added,
            Some(previous) if previous == value => return Ok(()),
            Some(_) => ChildEventKind::Changed,
        };
        self.dispatch(
            parent,
            ChildEvent {
                kind,
                key: key.to_string(),
                value,
            },
        );
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<(), RealtimeError> {
        let (parent, key) = split_path(path)?;
        if let Some(value) = self.values.remove(&format!("{parent}/{key}")) {
            self.dispatch(
                parent,
                ChildEvent {
                    kind: ChildEventKind::Removed,
                    key: key.to_string(),
                    value,
                },
            );
        }
        Ok(())
    }

    fn children(&self, parent: &str) -> Vec<(String, Value)> {
        let prefix = format!("{}/", parent.trim_end_matches('/'));
        self.values
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, value)| {
                let key = &path[prefix.len()..];
                (!key.contains('/')).then(|| (key.to_string(), value.clone()))
            })
            .collect()
    }

    fn dispatch(&mut self, parent: &str, event: ChildEvent) {
        self.watchers.retain(|watcher| {
            if watcher.parent == parent {
                watcher.deliver(event.clone())
            } else {
                !watcher.tx.is_closed()
            }
        });
    }
}

struct HubShared {
    clock: Arc<dyn Clock>,
    state: Mutex<HubState>,
}

/// A realtime tree held in memory and shared by cloning.
#[derive(Clone)]
pub struct RealtimeHub {
    shared: Arc<HubShared>,
}

impl std::fmt::Debug for RealtimeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("RealtimeHub")
            .field("values", &state.values)
            .field("watchers", &state.watchers.len())
            .finish()
    }
}

impl RealtimeHub {
    /// Creates an empty tree stamping server timestamps from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(HubShared {
                clock,
                state: Mutex::new(HubState::default()),
            }),
        }
    }

    /// Opens a new connected session.
    #[must_use]
    pub fn connect(&self) -> InMemoryRealtime {
        let session = Uuid::now_v7();
        tracing::debug!(session = %session, "realtime session connected");
        InMemoryRealtime {
            shared: Arc::clone(&self.shared),
            session,
            connected: AtomicBool::new(true),
        }
    }

    /// Reads the value at `path`.
    #[must_use]
    pub fn value(&self, path: &str) -> Option<Value> {
        self.shared.state.lock().values.get(path).cloned()
    }

    /// Lists the direct children of `parent` in key order.
    #[must_use]
    pub fn children(&self, parent: &str) -> Vec<(String, Value)> {
        self.shared.state.lock().children(parent)
    }

    /// Number of attached watchers whose receivers are still open.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        let mut state = self.shared.state.lock();
        state.watchers.retain(|watcher| !watcher.tx.is_closed());
        state.watchers.len()
    }
}

/// One session's connection to a [`RealtimeHub`].
///
/// Ending the session, by [`disconnect`](Self::disconnect) or by dropping
/// it, runs its registered on-disconnect writes and ends its watches.
pub struct InMemoryRealtime {
    shared: Arc<HubShared>,
    session: Uuid,
    connected: AtomicBool,
}

impl std::fmt::Debug for InMemoryRealtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRealtime")
            .field("session", &self.session)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl InMemoryRealtime {
    /// Identifier of this session.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session
    }

    /// Returns `true` until the session ends.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Ends the session. Later calls are no-ops.
    pub fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        let now = self.shared.clock.now_ms();
        let mut state = self.shared.state.lock();
        let writes = state.on_disconnect.remove(&self.session).unwrap_or_default();
        for (path, fields) in writes {
            if let Err(err) = state.write(&path, Value::Object(fields.resolve(now))) {
                tracing::warn!(path = %path, error = %err, "on-disconnect write failed");
            }
        }
        state.watchers.retain(|watcher| watcher.session != self.session);
        tracing::debug!(session = %self.session, "realtime session disconnected");
    }

    /// Removes the value at `path`, notifying watchers of its parent.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Disconnected`] after the session ended, or
    /// [`RealtimeError::InvalidPath`] for a path without a parent.
    pub fn remove_value(&self, path: &str) -> Result<(), RealtimeError> {
        self.ensure_connected()?;
        self.shared.state.lock().remove(path)
    }

    fn ensure_connected(&self) -> Result<(), RealtimeError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(RealtimeError::Disconnected)
        }
    }
}

impl RealtimeTransport for InMemoryRealtime {
    async fn set_value(&self, path: &str, fields: WriteFields) -> Result<(), RealtimeError> {
        self.ensure_connected()?;
        let value = Value::Object(fields.resolve(self.shared.clock.now_ms()));
        self.shared.state.lock().write(path, value)
    }

    async fn watch_children(&self, path: &str, buffer: usize) -> Result<ChildEvents, RealtimeError> {
        self.ensure_connected()?;
        let parent = path.trim_end_matches('/');
        if parent.is_empty() {
            return Err(RealtimeError::InvalidPath(path.to_string()));
        }

        let mut state = self.shared.state.lock();
        let existing = state.children(parent);
        // The replay gets its own room so it never eats the live buffer.
        let (tx, rx) = mpsc::channel(existing.len() + buffer.max(1));
        for (key, value) in existing {
            let _ = tx.try_send(ChildEvent {
                kind: ChildEventKind::Added,
                key,
                value,
            });
        }
        let overflow = Arc::new(Mutex::new(Overflow::default()));
        state.watchers.push(Watcher {
            session: self.session,
            parent: parent.to_string(),
            tx,
            overflow: Arc::clone(&overflow),
        });
        Ok(ChildEvents::new(rx, overflow))
    }

    async fn on_disconnect_set_value(
        &self,
        path: &str,
        fields: WriteFields,
    ) -> Result<(), RealtimeError> {
        self.ensure_connected()?;
        split_path(path)?;
        let mut state = self.shared.state.lock();
        let pending = state.on_disconnect.entry(self.session).or_default();
        pending.retain(|(existing, _)| existing != path);
        pending.push((path.to_string(), fields));
        Ok(())
    }
}

impl Drop for InMemoryRealtime {
    fn drop(&mut self) {
        self.disconnect();
    }
}
