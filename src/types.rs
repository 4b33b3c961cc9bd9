//! Core types for the auth emulator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Stable identifier of an authenticated subject.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        SubjectId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubjectId({})", self.0)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time. A clock before the epoch reads as zero.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0);
        Timestamp(micros)
    }

    pub fn as_millis(self) -> i64 {
        self.0 / 1000
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// The signed-in subject as seen by observers and callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Subject the session refers to.
    pub subject_id: SubjectId,
    /// Login identifier (email), if known. A restored session whose
    /// credential record is gone has none.
    pub identifier: Option<String>,
}

impl Identity {
    pub fn new(subject_id: SubjectId, identifier: impl Into<String>) -> Self {
        Self {
            subject_id,
            identifier: Some(identifier.into()),
        }
    }

    /// Identity known only by its subject.
    pub fn anonymous(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            identifier: None,
        }
    }
}

/// A stored identifier/secret pair.
///
/// Field names on the wire follow the browser slot the emulator has always
/// written, so existing stores keep loading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(rename = "email")]
    pub identifier: String,
    #[serde(rename = "uid")]
    pub subject_id: SubjectId,
    #[serde(rename = "password")]
    pub secret: String,
    /// Creation time; zero for records written before it was tracked.
    #[serde(default)]
    pub created: Timestamp,
}

/// Observable state of the emulator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn(Identity),
}

impl AuthState {
    pub fn from_identity(identity: Option<Identity>) -> Self {
        match identity {
            Some(identity) => AuthState::SignedIn(identity),
            None => AuthState::SignedOut,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthState::SignedIn(identity) => Some(identity),
            AuthState::SignedOut => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, AuthState::SignedIn(_))
    }
}
