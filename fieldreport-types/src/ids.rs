//! Identifier types for occurrence records.
//!
//! Provisional ids are generated on the device as UUID v7 (time-ordered),
//! canonical ids are assigned by the backend and treated as opaque strings.
//! A record's identity is always carried as an explicit tag — it is never
//! inferred from the shape or length of the id string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Locally generated provisional identifier for a record that has not yet
/// been acknowledged by the backend.
///
/// Uses UUID v7, which embeds a timestamp for natural ordering and is
/// unique for the lifetime of the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(Uuid);

impl LocalId {
    /// Creates a new provisional id with the current timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a provisional id from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses a provisional id from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Canonical identifier assigned by the backend when a record is accepted.
///
/// Opaque to the engine: the backend owns its format, and no assumption is
/// made about its length or encoding. Immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Wraps a backend-assigned id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RemoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A record's identity: provisional while pending, canonical once synced.
///
/// The tag is the single source of truth for which store collection holds
/// the record. Promotion replaces `Local` with `Remote` exactly once; the
/// reverse transition does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum RecordId {
    /// Locally generated, not yet acknowledged by the backend.
    Local(LocalId),
    /// Assigned by the backend, authoritative and immutable.
    Remote(RemoteId),
}

impl RecordId {
    /// Returns true if this is a provisional (local) identity.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, RecordId::Local(_))
    }

    /// Returns the provisional id, if this identity is local.
    #[must_use]
    pub fn as_local(&self) -> Option<&LocalId> {
        match self {
            RecordId::Local(id) => Some(id),
            RecordId::Remote(_) => None,
        }
    }

    /// Returns the canonical id, if this identity is remote.
    #[must_use]
    pub fn as_remote(&self) -> Option<&RemoteId> {
        match self {
            RecordId::Local(_) => None,
            RecordId::Remote(id) => Some(id),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Local(id) => write!(f, "local:{id}"),
            RecordId::Remote(id) => write!(f, "remote:{id}"),
        }
    }
}
