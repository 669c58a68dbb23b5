//! Identity gateway abstraction.
//!
//! The identity provider owns accounts and the "currently signed-in actor"
//! of a session. This crate only reads that actor; it never authenticates
//! anyone itself.

pub mod memory;

pub use memory::{AccountDirectory, InMemoryIdentity};

use taskhub_proto::user::UNKNOWN_USER_NAME;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// An authenticated end-user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Stable identity assigned at sign-up.
    pub id: String,
    /// Sign-in email.
    pub email: String,
    /// Display name, if one was set.
    pub display_name: Option<String>,
}

impl Actor {
    /// The name to show for this actor.
    ///
    /// Uses the display name, then the local part of the email, then
    /// `"Unknown User"`.
    #[must_use]
    pub fn name(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        match self.email.split('@').next() {
            Some(local) if !local.is_empty() => local.to_string(),
            _ => UNKNOWN_USER_NAME.to_string(),
        }
    }
}

/// Errors reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The email address is not plausible.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// The password is shorter than the provider accepts.
    #[error("password must be at least {min} characters")]
    WeakPassword {
        /// Minimum length in characters.
        min: usize,
    },

    /// An account with this email already exists.
    #[error("email already in use: {0}")]
    EmailInUse(String),

    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The provider could not be reached.
    #[error("identity provider unavailable")]
    Unavailable,
}

/// Async identity provider.
///
/// Implementations hold per-session sign-in state: a successful
/// [`sign_up`](IdentityGateway::sign_up) or
/// [`sign_in`](IdentityGateway::sign_in) makes the returned actor the
/// session's [`current_user`](IdentityGateway::current_user).
pub trait IdentityGateway: Send + Sync {
    /// Creates an account with a display name and signs it in.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> impl std::future::Future<Output = Result<Actor, IdentityError>> + Send;

    /// Signs in an existing account.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<Actor, IdentityError>> + Send;

    /// Ends the session's sign-in. Signing out twice is a no-op.
    fn sign_out(&self) -> impl std::future::Future<Output = ()> + Send;

    /// The session's signed-in actor, if any.
    fn current_user(&self) -> Option<Actor>;
}
