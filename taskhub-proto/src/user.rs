//! User profile records (`users/{userId}`: `{name, email, createdAt}`).
//!
//! Profiles are written once at registration and never mutated here.

use serde::{Deserialize, Serialize};

use crate::record::{Decoded, Document, FieldReader, WriteFields};

/// Stored field names for user records.
pub mod fields {
    /// Display name given at registration.
    pub const NAME: &str = "name";
    /// Email address given at registration.
    pub const EMAIL: &str = "email";
    /// Server-assigned registration time, epoch milliseconds.
    pub const CREATED_AT: &str = "createdAt";
}

/// Name shown for a profile without a usable name.
pub const UNKNOWN_USER_NAME: &str = "Unknown User";

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identity assigned by the identity provider.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Registration time, epoch milliseconds.
    pub created_at: u64,
}

/// Defaults applied to fields a stored profile lacks.
#[derive(Debug, Clone, Copy)]
pub struct UserDefaults<'a> {
    /// Used when `name` is missing or mistyped.
    pub name: &'a str,
    /// Used when `email` is missing or mistyped.
    pub email: &'a str,
}

impl Default for UserDefaults<'_> {
    fn default() -> Self {
        Self {
            name: UNKNOWN_USER_NAME,
            email: "",
        }
    }
}

impl User {
    /// Decodes a stored profile with the standard defaults.
    #[must_use]
    pub fn from_document(id: impl Into<String>, doc: &Document) -> Decoded<Self> {
        Self::decode(id, doc, UserDefaults::default())
    }

    /// Decodes a stored profile, filling gaps from `defaults`.
    #[must_use]
    pub fn decode(id: impl Into<String>, doc: &Document, defaults: UserDefaults<'_>) -> Decoded<Self> {
        let mut reader = FieldReader::new(doc);
        let user = Self {
            id: id.into(),
            name: reader.string(fields::NAME, defaults.name),
            email: reader.string(fields::EMAIL, defaults.email),
            created_at: reader.millis(fields::CREATED_AT),
        };
        reader.finish(user)
    }

    /// Builds the registration write for a new profile.
    #[must_use]
    pub fn profile_fields(name: &str, email: &str) -> WriteFields {
        WriteFields::new()
            .set(fields::NAME, name)
            .set(fields::EMAIL, email)
            .server_timestamp(fields::CREATED_AT)
    }
}
