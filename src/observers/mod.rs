//! Auth-state observers.
//!
//! Observers are either plain callbacks or bounded channels:
//! - Every observer gets the current identity once, as soon as it subscribes
//! - Every later sign-in, sign-up or sign-out is delivered in registration order
//! - A panicking callback is logged and skipped; the rest still run
//! - A channel observer whose buffer fills up is dropped
//!
//! # Example
//!
//! ```ignore
//! let registry = ObserverRegistry::new();
//!
//! let handle = registry.subscribe(None, |identity| match identity {
//!     Some(identity) => println!("signed in as {}", identity.subject_id),
//!     None => println!("signed out"),
//! });
//!
//! registry.notify_all(None);
//! handle.unsubscribe();
//! ```

mod registry;
mod types;

pub use registry::{Callback, ObserverRegistry};
pub use types::{AuthEvent, IdentityStream, ObserverHandle, ObserverId};
