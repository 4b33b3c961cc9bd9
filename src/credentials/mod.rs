//! Persisted identifier -> credential map.
//!
//! The whole map lives in a single storage slot as a JSON object keyed by
//! identifier and is rewritten after every mutation.

mod store;

pub use store::CredentialStore;
