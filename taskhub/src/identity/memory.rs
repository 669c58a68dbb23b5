//! In-process identity provider.
//!
//! An [`AccountDirectory`] is the shared account table; each
//! [`InMemoryIdentity`] is one device session against it with its own
//! sign-in state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::{Actor, IdentityError, IdentityGateway, MIN_PASSWORD_LEN};

#[derive(Debug, Clone)]
struct Account {
    id: String,
    password: String,
    display_name: Option<String>,
}

/// Shared table of registered accounts, keyed by normalized email.
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
}

impl AccountDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.lock().len()
    }

    /// Returns `true` if nobody has registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.lock().is_empty()
    }

    fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Actor, IdentityError> {
        let key = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            });
        }

        let mut accounts = self.accounts.lock();
        if accounts.contains_key(&key) {
            return Err(IdentityError::EmailInUse(key));
        }
        let display_name = Some(display_name.trim().to_string()).filter(|n| !n.is_empty());
        let account = Account {
            id: uuid::Uuid::now_v7().simple().to_string(),
            password: password.to_string(),
            display_name,
        };
        let actor = Actor {
            id: account.id.clone(),
            email: key.clone(),
            display_name: account.display_name.clone(),
        };
        accounts.insert(key, account);
        Ok(actor)
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<Actor, IdentityError> {
        let key = normalize_email(email).map_err(|_| IdentityError::InvalidCredentials)?;
        let accounts = self.accounts.lock();
        match accounts.get(&key) {
            Some(account) if account.password == password => Ok(Actor {
                id: account.id.clone(),
                email: key,
                display_name: account.display_name.clone(),
            }),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }
}

fn normalize_email(email: &str) -> Result<String, IdentityError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(email.to_lowercase())
        }
        _ => Err(IdentityError::InvalidEmail(email.to_string())),
    }
}

/// One session against an [`AccountDirectory`].
#[derive(Debug)]
pub struct InMemoryIdentity {
    directory: AccountDirectory,
    current: RwLock<Option<Actor>>,
}

impl InMemoryIdentity {
    /// Opens a signed-out session.
    #[must_use]
    pub fn new(directory: AccountDirectory) -> Self {
        Self {
            directory,
            current: RwLock::new(None),
        }
    }
}

impl IdentityGateway for InMemoryIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Actor, IdentityError> {
        let actor = self.directory.register(email, password, display_name)?;
        tracing::info!(user_id = %actor.id, "account registered");
        *self.current.write() = Some(actor.clone());
        Ok(actor)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Actor, IdentityError> {
        let actor = self.directory.authenticate(email, password)?;
        tracing::debug!(user_id = %actor.id, "signed in");
        *self.current.write() = Some(actor.clone());
        Ok(actor)
    }

    async fn sign_out(&self) {
        if let Some(actor) = self.current.write().take() {
            tracing::debug!(user_id = %actor.id, "signed out");
        }
    }

    fn current_user(&self) -> Option<Actor> {
        self.current.read().clone()
    }
}
