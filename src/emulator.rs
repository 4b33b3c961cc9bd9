//! The auth emulator tying credentials, session and observers together.

use crate::config::EmulatorConfig;
use crate::credentials::CredentialStore;
use crate::error::{AuthError, Result};
use crate::observers::{IdentityStream, ObserverHandle, ObserverRegistry};
use crate::session::SessionState;
use crate::storage::DurableStorage;
use crate::types::{AuthState, Identity, SubjectId};
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::Arc;

/// Default buffer for channel observers.
const DEFAULT_STREAM_BUFFER: usize = 64;

/// State guarded together so a transition is applied as one step.
struct EmulatorState {
    credentials: CredentialStore,
    session: SessionState,
}

impl EmulatorState {
    /// Move the session to `identity`, tolerating a failed marker write.
    fn enter(&mut self, identity: Identity) {
        let subject_id = identity.subject_id.clone();
        if let Err(e) = self.session.set(identity) {
            tracing::warn!(
                subject_id = %subject_id,
                error = %e,
                "Session marker not persisted; session will not survive a restart"
            );
        }
    }

    fn leave(&mut self) {
        if let Err(e) = self.session.clear() {
            tracing::warn!(error = %e, "Session marker not removed");
        }
    }
}

/// Local stand-in for a remote identity provider.
///
/// Offers sign-in, sign-up, sign-out, password reset and auth-state
/// subscriptions with the same shape as the remote client. Every successful
/// transition (and every sign-out) is delivered synchronously to all
/// observers in registration order before the call returns. Transitions
/// from different threads are serialized through their notification pass,
/// so observers always finish on the state the emulator is actually in.
///
/// Nothing here is a security boundary: secrets are stored and compared in
/// plain text.
pub struct AuthEmulator {
    /// Emulator configuration.
    config: EmulatorConfig,

    /// Credentials and session. Never held while observers run.
    state: Mutex<EmulatorState>,

    /// Held by a transition from its state change until its notification
    /// pass ends. Reentrant so an observer may start a transition itself.
    transition: ReentrantMutex<()>,

    /// Auth-state observers.
    observers: ObserverRegistry,
}

impl AuthEmulator {
    /// Build the emulator over `storage`, restoring credentials and any
    /// previous session.
    pub fn open(config: EmulatorConfig, storage: Arc<dyn DurableStorage>) -> Self {
        let credentials = CredentialStore::open(
            Arc::clone(&storage),
            config.credentials_key.clone(),
            config.subject_prefix.clone(),
        );

        let session = SessionState::open(storage, config.session_key.clone(), |subject_id| {
            credentials
                .find_by_subject(subject_id)
                .map(|record| record.identifier.clone())
        });

        Self {
            config,
            state: Mutex::new(EmulatorState {
                credentials,
                session,
            }),
            transition: ReentrantMutex::new(()),
            observers: ObserverRegistry::new(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    // --- Identity Operations ---

    /// Sign in with an identifier and secret.
    ///
    /// Any mismatch, including an unknown identifier, fails with
    /// [`AuthError::InvalidCredential`] and leaves the session untouched.
    pub fn sign_in(&self, identifier: &str, secret: &str) -> Result<Identity> {
        let _transition = self.transition.lock();
        let identity = {
            let mut state = self.state.lock();

            let subject_id = match state.credentials.validate(identifier, secret) {
                Some(subject_id) => subject_id,
                None => match self.demo_subject(identifier, secret) {
                    Some(subject_id) => {
                        tracing::info!(identifier = %identifier, "Demo credentials accepted");
                        subject_id
                    }
                    None => {
                        tracing::info!(identifier = %identifier, "Rejected sign-in");
                        return Err(AuthError::InvalidCredential);
                    }
                },
            };

            let identity = Identity::new(subject_id, identifier);
            state.enter(identity.clone());
            identity
        };

        tracing::info!(subject_id = %identity.subject_id, "Signed in");
        self.observers.notify_all(Some(&identity));
        Ok(identity)
    }

    /// Create an account and sign into it.
    pub fn sign_up(&self, identifier: &str, secret: &str) -> Result<Identity> {
        let _transition = self.transition.lock();
        let identity = {
            let mut state = self.state.lock();
            let subject_id = state.credentials.create(identifier, secret)?;

            let identity = Identity::new(subject_id, identifier);
            state.enter(identity.clone());
            identity
        };

        self.observers.notify_all(Some(&identity));
        Ok(identity)
    }

    /// Sign out. Always succeeds and always notifies, even when already
    /// signed out.
    pub fn sign_out(&self) {
        let _transition = self.transition.lock();
        {
            let mut state = self.state.lock();
            if let Some(identity) = state.session.get() {
                tracing::info!(subject_id = %identity.subject_id, "Signed out");
            }
            state.leave();
        }

        self.observers.notify_all(None);
    }

    /// Accept a password reset request without revealing whether the
    /// identifier exists. No mail is sent.
    pub fn request_password_reset(&self, identifier: &str) {
        tracing::info!(identifier = %identifier, "Password reset email would be sent");
    }

    fn demo_subject(&self, identifier: &str, secret: &str) -> Option<SubjectId> {
        self.config
            .demo_account
            .as_ref()
            .filter(|demo| demo.identifier == identifier && demo.secret == secret)
            .map(|demo| demo.subject_id.clone())
    }

    // --- Observers ---

    /// Observe auth-state changes. The callback runs once right away with
    /// the current identity.
    pub fn subscribe<F>(&self, callback: F) -> ObserverHandle
    where
        F: Fn(Option<&Identity>) + Send + Sync + 'static,
    {
        let _transition = self.transition.lock();
        let current = self.current_identity();
        self.observers.subscribe(current.as_ref(), callback)
    }

    /// Observe auth-state changes through a bounded channel.
    pub fn subscribe_channel(&self, buffer_size: Option<usize>) -> IdentityStream {
        let _transition = self.transition.lock();
        let current = self.current_identity();
        self.observers
            .subscribe_channel(current.as_ref(), buffer_size.unwrap_or(DEFAULT_STREAM_BUFFER))
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.observer_count()
    }

    // --- Queries ---

    /// Snapshot of the signed-in identity.
    pub fn current_identity(&self) -> Option<Identity> {
        self.state.lock().session.get().cloned()
    }

    pub fn state(&self) -> AuthState {
        AuthState::from_identity(self.current_identity())
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.lock().session.get().is_some()
    }

    /// Number of stored accounts.
    pub fn user_count(&self) -> usize {
        self.state.lock().credentials.len()
    }

    /// True once any durable read or write failed. Identity still
    /// transitions in memory but may not survive a restart.
    pub fn persistence_degraded(&self) -> bool {
        let state = self.state.lock();
        state.credentials.is_degraded() || state.session.is_degraded()
    }
}
