//! Credential store implementation.

use crate::error::{AuthError, Result};
use crate::storage::DurableStorage;
use crate::types::{CredentialRecord, SubjectId, Timestamp};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Durable mapping of identifier to credential record.
///
/// Storage failures never fail an operation here: the in-memory map stays
/// authoritative and the store is flagged as degraded. A slot that could not
/// be loaded is never overwritten, so its accounts stay recoverable.
pub struct CredentialStore {
    /// Backing storage.
    storage: Arc<dyn DurableStorage>,

    /// Slot holding the serialized map.
    key: String,

    /// Records by identifier.
    records: BTreeMap<String, CredentialRecord>,

    /// Prefix for generated subject ids.
    subject_prefix: String,

    /// Mixed into subject id generation so ids minted in the same
    /// millisecond differ.
    counter: u64,

    /// Set once a load or save against storage failed.
    degraded: bool,

    /// False if the slot existed but could not be loaded.
    writable: bool,
}

impl CredentialStore {
    /// Open the store, hydrating from `key` if the slot exists.
    ///
    /// An unreadable or corrupt slot is logged and the store starts empty.
    pub fn open(
        storage: Arc<dyn DurableStorage>,
        key: impl Into<String>,
        subject_prefix: impl Into<String>,
    ) -> Self {
        let mut store = Self {
            storage,
            key: key.into(),
            records: BTreeMap::new(),
            subject_prefix: subject_prefix.into(),
            counter: 0,
            degraded: false,
            writable: true,
        };

        match store.load() {
            Ok(records) => {
                if !records.is_empty() {
                    tracing::debug!(count = records.len(), "Hydrated credential store");
                }
                store.records = records;
            }
            Err(e) => {
                tracing::warn!(key = %store.key, error = %e, "Could not load stored credentials");
                store.degraded = true;
                store.writable = false;
            }
        }

        store
    }

    fn load(&self) -> Result<BTreeMap<String, CredentialRecord>> {
        match self.storage.get(&self.key)? {
            Some(encoded) => serde_json::from_str(&encoded)
                .map_err(|e| AuthError::Deserialization(e.to_string())),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Write the full map back to storage.
    fn persist(&mut self) {
        if !self.writable {
            tracing::warn!(
                key = %self.key,
                "Stored credentials were unreadable; keeping new accounts in memory only"
            );
            return;
        }

        let result = serde_json::to_string(&self.records)
            .map_err(AuthError::from)
            .and_then(|encoded| self.storage.set(&self.key, &encoded));

        if let Err(e) = result {
            tracing::warn!(
                key = %self.key,
                error = %e,
                "Credential write failed; continuing in memory"
            );
            self.degraded = true;
        }
    }

    /// Create a record for `identifier`, returning its new subject id.
    pub fn create(&mut self, identifier: &str, secret: &str) -> Result<SubjectId> {
        if self.records.contains_key(identifier) {
            return Err(AuthError::AlreadyExists(identifier.to_string()));
        }

        let created = Timestamp::now();
        let subject_id = self.generate_subject_id(identifier, created);

        self.records.insert(
            identifier.to_string(),
            CredentialRecord {
                identifier: identifier.to_string(),
                subject_id: subject_id.clone(),
                secret: secret.to_string(),
                created,
            },
        );
        self.persist();

        tracing::info!(identifier = %identifier, subject_id = %subject_id, "Created user");

        Ok(subject_id)
    }

    /// Look up a record.
    pub fn find(&self, identifier: &str) -> Option<&CredentialRecord> {
        self.records.get(identifier)
    }

    /// Look up a record, failing with `UserNotFound`.
    pub fn require(&self, identifier: &str) -> Result<&CredentialRecord> {
        self.find(identifier)
            .ok_or_else(|| AuthError::UserNotFound(identifier.to_string()))
    }

    /// Find the record owning a subject id.
    pub fn find_by_subject(&self, subject_id: &SubjectId) -> Option<&CredentialRecord> {
        self.records.values().find(|r| &r.subject_id == subject_id)
    }

    /// Subject id for `identifier` if the secret matches exactly.
    pub fn validate(&self, identifier: &str, secret: &str) -> Option<SubjectId> {
        self.records
            .get(identifier)
            .filter(|record| record.secret.as_bytes() == secret.as_bytes())
            .map(|record| record.subject_id.clone())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.records.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True once any read or write against storage failed.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn generate_subject_id(&mut self, identifier: &str, now: Timestamp) -> SubjectId {
        loop {
            self.counter += 1;

            let mut hasher = Sha256::new();
            hasher.update(identifier.as_bytes());
            hasher.update(now.0.to_le_bytes());
            hasher.update(self.counter.to_le_bytes());
            let digest = hasher.finalize();

            let candidate = SubjectId(format!(
                "{}{}-{}",
                self.subject_prefix,
                now.as_millis(),
                hex::encode(&digest[..4])
            ));

            if self.find_by_subject(&candidate).is_none() {
                return candidate;
            }
        }
    }
}
