//! Per-device session wiring.
//!
//! A [`Session`] bundles the services one signed-in device uses, all built
//! over the same three collaborators. A [`Sandbox`] provides in-memory
//! collaborators that several sessions can share, standing in for the
//! hosted backend.

use std::sync::Arc;

use crate::account::AccountService;
use crate::clock::Clock;
use crate::config::TaskhubConfig;
use crate::identity::{AccountDirectory, IdentityGateway, InMemoryIdentity};
use crate::notify::NotificationChannel;
use crate::presence::PresenceTracker;
use crate::realtime::{InMemoryRealtime, RealtimeHub, RealtimeTransport};
use crate::store::{DocumentStore, InMemoryDocumentStore};
use crate::tasks::{TaskBoard, TaskManager};

/// The services of one device session.
pub struct Session<I, S, R> {
    accounts: AccountService<I, S>,
    tasks: Arc<TaskManager<I, S, R>>,
    presence: PresenceTracker<R>,
    realtime: Arc<R>,
}

impl<I, S, R> Session<I, S, R>
where
    I: IdentityGateway,
    S: DocumentStore,
    R: RealtimeTransport,
{
    /// Wires a session from its collaborators.
    #[must_use]
    pub fn new(identity: Arc<I>, store: Arc<S>, realtime: Arc<R>, config: &TaskhubConfig) -> Self {
        let notices = NotificationChannel::new(Arc::clone(&realtime), config.channel_settings());
        let tasks = TaskManager::new(Arc::clone(&identity), Arc::clone(&store), notices)
            .with_collection(config.tasks_collection.clone());
        let accounts =
            AccountService::new(identity, store).with_collection(config.users_collection.clone());
        let presence = PresenceTracker::new(Arc::clone(&realtime), config.presence_path.clone());
        Self {
            accounts,
            tasks: Arc::new(tasks),
            presence,
            realtime,
        }
    }

    /// Account operations.
    #[must_use]
    pub const fn accounts(&self) -> &AccountService<I, S> {
        &self.accounts
    }

    /// The task manager.
    #[must_use]
    pub const fn tasks(&self) -> &Arc<TaskManager<I, S, R>> {
        &self.tasks
    }

    /// Session presence.
    #[must_use]
    pub const fn presence(&self) -> &PresenceTracker<R> {
        &self.presence
    }

    /// The session's realtime connection.
    #[must_use]
    pub const fn realtime(&self) -> &Arc<R> {
        &self.realtime
    }

    /// A fresh, empty board over this session's task manager.
    #[must_use]
    pub fn board(&self) -> TaskBoard<I, S, R> {
        TaskBoard::new(Arc::clone(&self.tasks))
    }

    /// Signs in and announces presence. Returns `false` if sign-in failed.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        if !self.accounts.login(email, password).await {
            return false;
        }
        self.announce().await;
        true
    }

    /// Registers, signs in and announces presence. Returns `false` if
    /// registration failed.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> bool {
        if !self.accounts.register(email, password, name).await {
            return false;
        }
        self.announce().await;
        true
    }

    async fn announce(&self) {
        if let Some(actor) = self.accounts.current_actor() {
            self.presence.announce(&actor).await;
        }
    }
}

/// A session over the in-memory backends.
pub type SandboxSession = Session<InMemoryIdentity, InMemoryDocumentStore, InMemoryRealtime>;

/// Shared in-memory backends.
#[derive(Debug, Clone)]
pub struct Sandbox {
    directory: AccountDirectory,
    store: Arc<InMemoryDocumentStore>,
    hub: RealtimeHub,
}

impl Sandbox {
    /// Creates empty backends stamping server time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            directory: AccountDirectory::new(),
            store: Arc::new(InMemoryDocumentStore::new(Arc::clone(&clock))),
            hub: RealtimeHub::new(clock),
        }
    }

    /// Opens a signed-out session with its own realtime connection.
    #[must_use]
    pub fn open_session(&self, config: &TaskhubConfig) -> SandboxSession {
        Session::new(
            Arc::new(InMemoryIdentity::new(self.directory.clone())),
            Arc::clone(&self.store),
            Arc::new(self.hub.connect()),
            config,
        )
    }

    /// The shared document store.
    #[must_use]
    pub const fn store(&self) -> &Arc<InMemoryDocumentStore> {
        &self.store
    }

    /// The shared realtime tree.
    #[must_use]
    pub const fn hub(&self) -> &RealtimeHub {
        &self.hub
    }

    /// The shared account table.
    #[must_use]
    pub const fn directory(&self) -> &AccountDirectory {
        &self.directory
    }
}
