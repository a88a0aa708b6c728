//! Sync error types.

use docveil_crypto::CryptoError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while opening or syncing a document.
///
/// `Integrity` and `NotFound` are deliberately separate: the first means the
/// key is wrong or the blob was tampered with and needs user attention, the
/// second means the document has never been created.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("blob store request failed: {0}")]
    Transport(String),

    #[error("bearer credential rejected")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no keyring entry for member {0}")]
    MissingKeyringEntry(String),

    #[error("unsupported document format version {0}")]
    UnsupportedFormat(u32),

    #[error("authentication required")]
    AuthRequired,

    #[error("credential provider failed: {0}")]
    Credentials(String),

    #[error("session closed")]
    SessionClosed,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Returns true if the next sync trigger may succeed without user action.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SyncError::Transport(_) | SyncError::Unauthorized)
    }

    /// Returns true for authentication-tag failures on decrypt.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, SyncError::Integrity(_))
    }
}

impl From<CryptoError> for SyncError {
    fn from(e: CryptoError) -> Self {
        if e.is_integrity_failure() {
            SyncError::Integrity(e.to_string())
        } else {
            SyncError::Crypto(e)
        }
    }
}
