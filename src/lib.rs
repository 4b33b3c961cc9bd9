//! # Auth Emulator
//!
//! A local stand-in for a remote identity provider, used when no real
//! provider is configured. It keeps the provider's observable contract:
//! the same operations, error codes, and auth-state notifications.
//!
//! ## Core Concepts
//!
//! - **Credentials**: identifier/secret pairs with a generated subject id, persisted as one slot
//! - **Session**: the signed-in subject, restored from a marker slot at startup
//! - **Observers**: callbacks or channels told about every auth-state change
//! - **Storage**: any key/value slots that survive a restart
//!
//! ## Example
//!
//! ```ignore
//! use auth_emulator::{AuthEmulator, EmulatorConfig, MemoryStorage};
//! use std::sync::Arc;
//!
//! let auth = AuthEmulator::open(EmulatorConfig::default(), Arc::new(MemoryStorage::new()));
//!
//! let handle = auth.subscribe(|identity| println!("auth state: {:?}", identity));
//!
//! let identity = auth.sign_up("demo@x.com", "demo123")?;
//! auth.sign_out();
//! assert_eq!(auth.sign_in("demo@x.com", "demo123")?.subject_id, identity.subject_id);
//!
//! handle.unsubscribe();
//! ```

pub mod config;
pub mod credentials;
pub mod emulator;
pub mod error;
pub mod observers;
pub mod provider;
pub mod session;
pub mod storage;
pub mod types;

// Re-exports
pub use config::{resolve_backend, ApiEndpoint, Backend, DemoAccount, EmulatorConfig, ProviderSettings};
pub use credentials::CredentialStore;
pub use emulator::AuthEmulator;
pub use error::{AuthError, Result};
pub use observers::{AuthEvent, Callback, IdentityStream, ObserverHandle, ObserverId, ObserverRegistry};
pub use provider::IdentityProvider;
pub use session::SessionState;
pub use storage::{DurableStorage, FileStorage, MemoryStorage};
pub use types::*;
