//! Error types for cryptographic operations.

use thiserror::Error;

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations.
///
/// `Authentication` is the integrity failure: an AEAD tag did not verify,
/// which means the data was tampered with or the key (or PIN) is wrong.
/// Every other variant is a primitive or format failure.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("authentication failed (wrong key or tampered data)")]
    Authentication,

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("PIN rejected by policy: {0}")]
    WeakPin(String),

    #[error("key unwrap failed: {0}")]
    Unwrap(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CryptoError {
    /// Returns true if this error came from a failed authentication tag check.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, CryptoError::Authentication)
    }
}

impl From<base64::DecodeError> for CryptoError {
    fn from(e: base64::DecodeError) -> Self {
        CryptoError::InvalidFormat(format!("base64: {e}"))
    }
}
