//! Account operations: registration, sign-in and user profiles.
//!
//! Registration and sign-in report plain success or failure; the reason is
//! logged, not returned.

use std::sync::Arc;

use taskhub_proto::User;
use taskhub_proto::layout::USERS_COLLECTION;
use taskhub_proto::user::{UNKNOWN_USER_NAME, UserDefaults};

use crate::identity::{Actor, IdentityGateway};
use crate::store::{DocumentStore, StoreError};

/// Account operations for one session.
pub struct AccountService<I, S> {
    identity: Arc<I>,
    store: Arc<S>,
    collection: String,
}

impl<I: IdentityGateway, S: DocumentStore> AccountService<I, S> {
    /// Creates the service over the default `users` collection.
    #[must_use]
    pub fn new(identity: Arc<I>, store: Arc<S>) -> Self {
        Self {
            identity,
            store,
            collection: USERS_COLLECTION.to_string(),
        }
    }

    /// Uses `collection` instead of `users`.
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Signs up, sets the display name and writes the user profile.
    ///
    /// Returns `false` if any step fails. A sign-up whose profile write
    /// failed leaves the account signed in without a stored profile.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> bool {
        let actor = match self.identity.sign_up(email, password, name).await {
            Ok(actor) => actor,
            Err(err) => {
                tracing::warn!(error = %err, "registration rejected");
                return false;
            }
        };
        match self
            .store
            .set(&self.collection, &actor.id, User::profile_fields(name, email))
            .await
        {
            Ok(()) => {
                tracing::info!(user_id = %actor.id, "user profile created");
                true
            }
            Err(err) => {
                tracing::warn!(user_id = %actor.id, error = %err, "user profile write failed");
                false
            }
        }
    }

    /// Signs in. Returns `false` on any failure.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        match self.identity.sign_in(email, password).await {
            Ok(actor) => {
                tracing::info!(user_id = %actor.id, "logged in");
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "login failed");
                false
            }
        }
    }

    /// Signs out.
    pub async fn logout(&self) {
        self.identity.sign_out().await;
    }

    /// Returns `true` while an actor is signed in.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.identity.current_user().is_some()
    }

    /// The signed-in actor, if any.
    #[must_use]
    pub fn current_actor(&self) -> Option<Actor> {
        self.identity.current_user()
    }

    /// The signed-in actor's profile.
    ///
    /// Profile fields the store lacks are filled from the identity provider
    /// (display name, email), then from `"Unknown User"` and `""`. A missing
    /// profile document yields those fallbacks rather than `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the profile cannot be read.
    pub async fn current_profile(&self) -> Result<Option<User>, StoreError> {
        let Some(actor) = self.identity.current_user() else {
            return Ok(None);
        };
        let doc = self.store.get(&self.collection, &actor.id).await?;
        let fields = doc.map(|doc| doc.fields).unwrap_or_default();
        let defaults = UserDefaults {
            name: actor.display_name.as_deref().unwrap_or(UNKNOWN_USER_NAME),
            email: &actor.email,
        };
        Ok(Some(User::decode(actor.id.clone(), &fields, defaults).into_value()))
    }

    /// Every registered user profile, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let docs = self.store.query_all(&self.collection, None).await?;
        Ok(docs
            .into_iter()
            .map(|doc| {
                let decoded = User::from_document(doc.id, &doc.fields);
                for fallback in decoded.malformed() {
                    tracing::warn!(
                        user_id = %decoded.value.id,
                        field = fallback.field,
                        reason = ?fallback.reason,
                        "malformed user field replaced by default"
                    );
                }
                decoded.into_value()
            })
            .collect())
    }
}
