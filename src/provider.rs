//! Backend-agnostic identity provider contract.
//!
//! UI code talks to this trait so it does not care whether a remote
//! provider or [`AuthEmulator`] is behind it. Operations that may touch the
//! network return futures; the emulator's futures are already complete.

use crate::emulator::AuthEmulator;
use crate::error::Result;
use crate::observers::ObserverHandle;
use crate::types::Identity;
use std::future::{ready, Future};

/// Client-side identity provider.
pub trait IdentityProvider: Send + Sync {
    fn sign_in(&self, identifier: &str, secret: &str) -> impl Future<Output = Result<Identity>> + Send;

    fn sign_up(&self, identifier: &str, secret: &str) -> impl Future<Output = Result<Identity>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;

    fn request_password_reset(&self, identifier: &str) -> impl Future<Output = Result<()>> + Send;

    /// Snapshot of the signed-in identity.
    fn current_identity(&self) -> Option<Identity>;

    /// Observe auth-state changes, starting with a replay of the current state.
    fn on_auth_state_changed<F>(&self, callback: F) -> ObserverHandle
    where
        F: Fn(Option<&Identity>) + Send + Sync + 'static;
}

impl IdentityProvider for AuthEmulator {
    fn sign_in(&self, identifier: &str, secret: &str) -> impl Future<Output = Result<Identity>> + Send {
        ready(AuthEmulator::sign_in(self, identifier, secret))
    }

    fn sign_up(&self, identifier: &str, secret: &str) -> impl Future<Output = Result<Identity>> + Send {
        ready(AuthEmulator::sign_up(self, identifier, secret))
    }

    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send {
        AuthEmulator::sign_out(self);
        ready(Ok(()))
    }

    fn request_password_reset(&self, identifier: &str) -> impl Future<Output = Result<()>> + Send {
        AuthEmulator::request_password_reset(self, identifier);
        ready(Ok(()))
    }

    fn current_identity(&self) -> Option<Identity> {
        AuthEmulator::current_identity(self)
    }

    fn on_auth_state_changed<F>(&self, callback: F) -> ObserverHandle
    where
        F: Fn(Option<&Identity>) + Send + Sync + 'static,
    {
        self.subscribe(callback)
    }
}
