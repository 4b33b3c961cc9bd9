//! Durable key/value slots backing credentials and the session marker.
//!
//! The emulator only needs three operations on an opaque string map, so
//! anything that survives a restart can back it: the in-process
//! [`MemoryStorage`] for tests and demos, or [`FileStorage`] for a
//! directory on disk.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// Keyed string slots that survive a process restart.
pub trait DurableStorage: Send + Sync {
    /// Read a slot. `Ok(None)` means the slot was never written or was removed.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace a slot's value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a slot. Removing a missing slot is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
