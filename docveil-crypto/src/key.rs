//! Symmetric document keys and PIN-based key derivation.

use crate::error::{CryptoError, CryptoResult};
use aes_gcm::aead::{KeyInit, OsRng};
use aes_gcm::Aes256Gcm;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of a PBKDF2 salt in bytes.
pub const SALT_SIZE: usize = 16;

/// A 256-bit AES-GCM key.
///
/// One key is active per document. The raw bytes leave this type only
/// to be wrapped for a keyring member or exported by an explicit caller.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a key from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self { bytes })
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Exports the raw key as standard base64.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.bytes)
    }

    /// Imports a raw key from standard base64.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let mut raw = BASE64.decode(encoded)?;
        let key = Self::from_slice(&raw);
        raw.zeroize();
        key
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for SymmetricKey {}

/// Generates a fresh random AES-256-GCM key.
pub fn generate_symmetric_key() -> SymmetricKey {
    let key = Aes256Gcm::generate_key(&mut OsRng);
    SymmetricKey {
        bytes: key.into(),
    }
}

/// Random salt for PIN key derivation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generates a random salt.
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// PBKDF2 parameters for deriving a wrapping key from a PIN.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KdfParams {
    /// PBKDF2-HMAC-SHA256 iteration count.
    pub iterations: u32,
}

impl KdfParams {
    /// Iteration count used for every persisted PIN-protected key.
    pub const DEFAULT_ITERATIONS: u32 = 100_000;
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: Self::DEFAULT_ITERATIONS,
        }
    }
}

/// Derives a 256-bit AES-GCM wrapping key from a PIN and salt.
pub fn derive_key(pin: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<SymmetricKey> {
    if params.iterations == 0 {
        return Err(CryptoError::KeyDerivation(
            "iteration count must be non-zero".to_string(),
        ));
    }

    let mut out = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(pin.as_bytes(), salt.as_bytes(), params.iterations, &mut out);
    let key = SymmetricKey::from_bytes(out);
    out.zeroize();
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_differ() {
        let a = generate_symmetric_key();
        let b = generate_symmetric_key();
        assert_ne!(a, b);
    }

    #[test]
    fn base64_export_import_roundtrip() {
        let key = generate_symmetric_key();
        let restored = SymmetricKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key, restored);
    }

    #[test]
    fn from_slice_rejects_short_key() {
        let err = SymmetricKey::from_slice(&[0u8; 16]).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        ));
    }

    #[test]
    fn debug_does_not_leak_key_bytes() {
        let key = SymmetricKey::from_bytes([0xAB; KEY_SIZE]);
        assert_eq!(format!("{key:?}"), "SymmetricKey([REDACTED])");
    }

    #[test]
    fn derivation_is_deterministic_per_salt() {
        let salt = Salt::from_bytes([7u8; SALT_SIZE]);
        let params = KdfParams { iterations: 1_000 };
        let a = derive_key("1234", &salt, &params).unwrap();
        let b = derive_key("1234", &salt, &params).unwrap();
        assert_eq!(a, b);

        let other_salt = Salt::from_bytes([8u8; SALT_SIZE]);
        let c = derive_key("1234", &other_salt, &params).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn zero_iterations_rejected() {
        let salt = Salt::random();
        let err = derive_key("1234", &salt, &KdfParams { iterations: 0 }).unwrap_err();
        assert!(matches!(err, CryptoError::KeyDerivation(_)));
    }

    #[test]
    fn default_iterations_match_persisted_format() {
        assert_eq!(KdfParams::default().iterations, 100_000);
    }
}
