//! Observer types.

use super::registry::Registry;
use crate::types::Identity;
use serde::{Deserialize, Serialize};
use std::sync::Weak;

/// Unique identifier for an observer. Ids increase with registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(pub u64);

/// Auth-state change as delivered to channel observers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn { identity: Identity },
    SignedOut,
}

impl AuthEvent {
    pub fn from_identity(identity: Option<&Identity>) -> Self {
        match identity {
            Some(identity) => AuthEvent::SignedIn {
                identity: identity.clone(),
            },
            None => AuthEvent::SignedOut,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthEvent::SignedIn { identity } => Some(identity),
            AuthEvent::SignedOut => None,
        }
    }
}

/// Returned by `subscribe`; removes the observer when asked.
///
/// Dropping the handle leaves the observer registered.
#[derive(Clone, Debug)]
pub struct ObserverHandle {
    pub id: ObserverId,
    pub(super) registry: Weak<Registry>,
}

impl ObserverHandle {
    /// Remove the observer. Safe to call more than once, and from inside a
    /// notification.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    /// Whether the observer is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.contains(self.id))
            .unwrap_or(false)
    }
}

/// Channel-backed observer.
pub struct IdentityStream {
    pub handle: ObserverHandle,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<AuthEvent>,
}

impl IdentityStream {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<AuthEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<AuthEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<AuthEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn unsubscribe(&self) {
        self.handle.unsubscribe();
    }
}
