//! Current signed-in identity and its durable session marker.

use crate::error::Result;
use crate::storage::DurableStorage;
use crate::types::{Identity, SubjectId};
use std::sync::Arc;

/// Session state, restored once from storage at startup.
pub struct SessionState {
    storage: Arc<dyn DurableStorage>,
    key: String,
    current: Option<Identity>,
    degraded: bool,
}

impl SessionState {
    /// Open the session, restoring it from the marker slot if one exists.
    ///
    /// `resolve_identifier` maps the restored subject back to its login
    /// identifier. The marker is trusted as-is: a subject with no matching
    /// credential still restores as signed in, just without an identifier.
    pub fn open<F>(storage: Arc<dyn DurableStorage>, key: impl Into<String>, resolve_identifier: F) -> Self
    where
        F: FnOnce(&SubjectId) -> Option<String>,
    {
        let key = key.into();
        let mut degraded = false;

        let current = match storage.get(&key) {
            Ok(Some(marker)) => parse_marker(&marker).map(|subject_id| {
                let identifier = resolve_identifier(&subject_id);
                tracing::info!(
                    subject_id = %subject_id,
                    known = identifier.is_some(),
                    "Restored session"
                );
                Identity {
                    subject_id,
                    identifier,
                }
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Could not read session marker");
                degraded = true;
                None
            }
        };

        Self {
            storage,
            key,
            current,
            degraded,
        }
    }

    pub fn get(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    /// Replace the current identity and persist the marker.
    ///
    /// The in-memory identity changes even if the write fails; the error is
    /// returned so the caller can note that persistence was lost.
    pub fn set(&mut self, identity: Identity) -> Result<()> {
        let result = self.storage.set(&self.key, identity.subject_id.as_str());
        self.current = Some(identity);
        self.track(result)
    }

    /// Drop the current identity and remove the marker.
    pub fn clear(&mut self) -> Result<()> {
        self.current = None;
        let result = self.storage.remove(&self.key);
        self.track(result)
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn track(&mut self, result: Result<()>) -> Result<()> {
        if result.is_err() {
            self.degraded = true;
        }
        result
    }
}

/// Read a marker slot. Some pages stored the subject as a JSON string
/// literal, so a quoted marker is unquoted first.
fn parse_marker(marker: &str) -> Option<SubjectId> {
    let marker = marker.trim();
    let subject = if marker.starts_with('"') {
        serde_json::from_str::<String>(marker).ok()?
    } else {
        marker.to_string()
    };

    if subject.is_empty() {
        None
    } else {
        Some(SubjectId(subject))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    const KEY: &str = "user";

    fn open(storage: &MemoryStorage) -> SessionState {
        SessionState::open(Arc::new(storage.clone()), KEY, |_| None)
    }

    #[test]
    fn test_starts_empty() {
        let storage = MemoryStorage::new();
        let session = open(&storage);
        assert!(session.get().is_none());
    }

    #[test]
    fn test_set_persists_marker() {
        let storage = MemoryStorage::new();
        let mut session = open(&storage);

        session
            .set(Identity::new(SubjectId::new("user-1"), "a@x.com"))
            .unwrap();
        assert_eq!(storage.get(KEY).unwrap().as_deref(), Some("user-1"));

        let restored = open(&storage);
        assert_eq!(restored.get().unwrap().subject_id.as_str(), "user-1");
        assert_eq!(restored.get().unwrap().identifier, None);
    }

    #[test]
    fn test_clear_removes_marker() {
        let storage = MemoryStorage::new();
        let mut session = open(&storage);
        session
            .set(Identity::anonymous(SubjectId::new("user-1")))
            .unwrap();

        session.clear().unwrap();
        assert!(session.get().is_none());
        assert_eq!(storage.get(KEY).unwrap(), None);
    }

    #[test]
    fn test_restore_resolves_identifier() {
        let storage = MemoryStorage::new();
        storage.set(KEY, "user-1").unwrap();

        let session = SessionState::open(Arc::new(storage), KEY, |subject| {
            (subject.as_str() == "user-1").then(|| "a@x.com".to_string())
        });
        assert_eq!(
            session.get(),
            Some(&Identity::new(SubjectId::new("user-1"), "a@x.com"))
        );
    }

    #[test]
    fn test_parse_marker() {
        assert_eq!(parse_marker("user-1"), Some(SubjectId::new("user-1")));
        assert_eq!(parse_marker("\"user-1\""), Some(SubjectId::new("user-1")));
        assert_eq!(parse_marker("  "), None);
        assert_eq!(parse_marker("\"\""), None);
        assert_eq!(parse_marker("\"unterminated"), None);
    }
}
