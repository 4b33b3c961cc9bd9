//! Directory-backed storage, one checksummed file per slot.

use super::DurableStorage;
use crate::error::{AuthError, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for slot files.
const SLOT_MAGIC: &[u8; 4] = b"AES\0";

/// Current slot format version.
const SLOT_VERSION: u8 = 1;

/// Extension for slot files.
const SLOT_EXTENSION: &str = "slot";

/// Extension for a slot being written, renamed over the slot once synced.
const PENDING_EXTENSION: &str = "slot.tmp";

/// Bytes around the value: magic, version, length, checksum.
const SLOT_OVERHEAD: u64 = 4 + 1 + 8 + 4;

/// Durable slots stored as files under a directory.
///
/// Layout of each slot file:
/// magic (4) | version (1) | length (u64 LE) | UTF-8 value | crc32 (u32 LE)
///
/// Writes go to a sibling file that is synced and then renamed over the
/// slot, so a crash mid-write leaves the previous value intact.
///
/// The directory is held under an exclusive lock for the lifetime of the
/// storage; a second process opening it gets [`AuthError::Locked`].
pub struct FileStorage {
    /// Base directory.
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,
}

impl FileStorage {
    /// Open (creating if needed) storage rooted at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let lock_file = Self::acquire_lock(&path)?;

        Ok(Self {
            path,
            _lock_file: lock_file,
        })
    }

    /// Base directory of this storage.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join("LOCK"))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| AuthError::Locked)?;

        Ok(lock_file)
    }

    /// Keys are hex-encoded so any string maps to a safe file name.
    fn slot_path(&self, key: &str) -> PathBuf {
        self.path
            .join(format!("{}.{}", hex::encode(key.as_bytes()), SLOT_EXTENSION))
    }

    fn pending_path(&self, key: &str) -> PathBuf {
        self.path
            .join(format!("{}.{}", hex::encode(key.as_bytes()), PENDING_EXTENSION))
    }

    fn read_slot(path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != SLOT_MAGIC {
            return Err(AuthError::InvalidFormat("Invalid slot magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != SLOT_VERSION {
            return Err(AuthError::InvalidFormat(format!(
                "Unsupported slot version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);

        // Never trust the header for the allocation size
        if len > file_len.saturating_sub(SLOT_OVERHEAD) {
            return Err(AuthError::InvalidFormat(format!(
                "Slot length {} exceeds file size {}",
                len, file_len
            )));
        }

        let mut content = vec![0u8; len as usize];
        file.read_exact(&mut content)?;

        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let expected = u32::from_le_bytes(checksum_bytes);
        let got = crc32fast::hash(&content);
        if expected != got {
            return Err(AuthError::ChecksumMismatch { expected, got });
        }

        String::from_utf8(content)
            .map_err(|e| AuthError::InvalidFormat(format!("Slot is not UTF-8: {}", e)))
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_slot(&path).map(Some)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let pending = self.pending_path(key);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&pending)?;

        let content = value.as_bytes();

        file.write_all(SLOT_MAGIC)?;
        file.write_all(&[SLOT_VERSION])?;
        file.write_all(&(content.len() as u64).to_le_bytes())?;
        file.write_all(content)?;
        file.write_all(&crc32fast::hash(content).to_le_bytes())?;

        file.sync_all()?;
        drop(file);

        fs::rename(&pending, self.slot_path(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
