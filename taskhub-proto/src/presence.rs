//! Session presence records (`presence/{userId}`:
//! `{status, lastSeen, userName}`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ParseEnumError;
use crate::record::{Decoded, FieldReader, WriteFields, as_document};

/// Stored field names for presence records.
pub mod fields {
    /// `online` or `offline`.
    pub const STATUS: &str = "status";
    /// Server time of the last status write.
    pub const LAST_SEEN: &str = "lastSeen";
    /// Display name of the session's actor.
    pub const USER_NAME: &str = "userName";
}

/// Presence status of a user session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// Session is connected.
    Online,
    /// Session ended or dropped.
    #[default]
    Offline,
}

impl PresenceStatus {
    /// The stored string for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresenceStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            other => Err(ParseEnumError::new("presence status", other)),
        }
    }
}

/// A user's advertised presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    /// Current status.
    pub status: PresenceStatus,
    /// Server time of the last write.
    pub last_seen: u64,
    /// Display name.
    pub user_name: String,
}

impl PresenceRecord {
    /// Builds a presence write; `lastSeen` is server-stamped.
    #[must_use]
    pub fn fields(status: PresenceStatus, user_name: &str) -> WriteFields {
        WriteFields::new()
            .set(fields::STATUS, status.as_str())
            .server_timestamp(fields::LAST_SEEN)
            .set(fields::USER_NAME, user_name)
    }

    /// Decodes a presence value read from the realtime tree.
    #[must_use]
    pub fn from_value(value: &Value) -> Decoded<Self> {
        let doc = as_document(value);
        let mut reader = FieldReader::new(&doc);
        let record = Self {
            status: reader.parsed(fields::STATUS),
            last_seen: reader.millis(fields::LAST_SEEN),
            user_name: reader.string(fields::USER_NAME, crate::user::UNKNOWN_USER_NAME),
        };
        reader.finish(record)
    }
}
