//! Error types for the auth emulator.

use thiserror::Error;

/// Main error type for identity operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Identifier already in use: {0}")]
    AlreadyExists(String),

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Durable storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid storage format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Storage is locked by another process")]
    Locked,
}

impl AuthError {
    /// Wire code used by the remote identity provider for the same failure.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::AlreadyExists(_) => "auth/email-already-in-use",
            AuthError::InvalidCredential => "auth/invalid-credential",
            AuthError::UserNotFound(_) => "auth/user-not-found",
            AuthError::StorageUnavailable(_)
            | AuthError::Io(_)
            | AuthError::InvalidFormat(_)
            | AuthError::ChecksumMismatch { .. }
            | AuthError::Locked => "auth/storage-unavailable",
            AuthError::Serialization(_) | AuthError::Deserialization(_) => "auth/internal-error",
        }
    }

    /// True if the error only means durable persistence was lost.
    pub fn is_storage(&self) -> bool {
        self.code() == "auth/storage-unavailable"
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::Serialization(e.to_string())
    }
}

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_provider() {
        assert_eq!(
            AuthError::AlreadyExists("a@x.com".into()).code(),
            "auth/email-already-in-use"
        );
        assert_eq!(AuthError::InvalidCredential.code(), "auth/invalid-credential");
        assert_eq!(
            AuthError::UserNotFound("a@x.com".into()).code(),
            "auth/user-not-found"
        );
    }

    #[test]
    fn test_storage_classification() {
        assert!(AuthError::StorageUnavailable("quota".into()).is_storage());
        assert!(AuthError::Locked.is_storage());
        assert!(AuthError::ChecksumMismatch { expected: 1, got: 2 }.is_storage());
        assert!(!AuthError::InvalidCredential.is_storage());
        assert!(!AuthError::Serialization("bad".into()).is_storage());
    }
}
