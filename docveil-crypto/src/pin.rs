//! PIN-protected storage of the identity private key.
//!
//! Layout: `base64(salt[16] ‖ iv[12] ‖ AES-256-GCM(pkcs8))`. The wrapping
//! key is PBKDF2-HMAC-SHA256(pin, salt, 100 000 iterations). Salt and IV
//! are fresh on every call, so protecting the same key twice never yields
//! the same blob.
//!
//! No PIN strength floor is enforced here. Callers that want one check
//! [`PinPolicy`] before calling [`encrypt_private_key`].

use crate::cipher::{self, NONCE_SIZE, TAG_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::identity::IdentityPrivateKey;
use crate::key::{KdfParams, SALT_SIZE, Salt, derive_key};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// A private key encrypted under a PIN-derived key, base64-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinProtectedPrivateKey(String);

impl PinProtectedPrivateKey {
    /// Wraps an already-encoded blob (e.g. loaded from storage).
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Returns the base64 blob.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Encrypts a private key with a PIN using the default KDF parameters.
pub fn encrypt_private_key(
    private_key: &IdentityPrivateKey,
    pin: &str,
) -> CryptoResult<PinProtectedPrivateKey> {
    encrypt_private_key_with_params(private_key, pin, &KdfParams::default())
}

/// Encrypts a private key with a PIN and explicit KDF parameters.
pub fn encrypt_private_key_with_params(
    private_key: &IdentityPrivateKey,
    pin: &str,
    params: &KdfParams,
) -> CryptoResult<PinProtectedPrivateKey> {
    let salt = Salt::random();
    let wrapping_key = derive_key(pin, &salt, params)?;
    let der = private_key.to_pkcs8_der()?;
    let sealed = cipher::seal(&wrapping_key, &der)?;

    let mut blob = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + sealed.ciphertext.len());
    blob.extend_from_slice(salt.as_bytes());
    blob.extend_from_slice(&sealed.iv);
    blob.extend_from_slice(&sealed.ciphertext);

    Ok(PinProtectedPrivateKey(BASE64.encode(&blob)))
}

/// Decrypts a PIN-protected private key using the default KDF parameters.
///
/// A wrong PIN fails with [`CryptoError::Authentication`].
pub fn decrypt_private_key(
    protected: &PinProtectedPrivateKey,
    pin: &str,
) -> CryptoResult<IdentityPrivateKey> {
    decrypt_private_key_with_params(protected, pin, &KdfParams::default())
}

/// Decrypts a PIN-protected private key with explicit KDF parameters.
pub fn decrypt_private_key_with_params(
    protected: &PinProtectedPrivateKey,
    pin: &str,
    params: &KdfParams,
) -> CryptoResult<IdentityPrivateKey> {
    let blob = BASE64.decode(&protected.0)?;
    if blob.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::InvalidFormat(format!(
            "PIN-protected key too short: {} bytes",
            blob.len()
        )));
    }

    let (salt_bytes, rest) = blob.split_at(SALT_SIZE);
    let (iv, ciphertext) = rest.split_at(NONCE_SIZE);

    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(salt_bytes);
    let wrapping_key = derive_key(pin, &Salt::from_bytes(salt), params)?;

    let der = Zeroizing::new(cipher::open(&wrapping_key, iv, ciphertext)?);
    IdentityPrivateKey::from_pkcs8_der(&der)
}

/// Optional PIN policy for callers that want a strength floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinPolicy {
    pub min_length: usize,
    pub digits_only: bool,
}

impl PinPolicy {
    /// Accepts any PIN, including the empty string.
    pub const NONE: PinPolicy = PinPolicy {
        min_length: 0,
        digits_only: false,
    };

    /// Checks a PIN against this policy.
    pub fn check(&self, pin: &str) -> CryptoResult<()> {
        let len = pin.chars().count();
        if len < self.min_length {
            return Err(CryptoError::WeakPin(format!(
                "PIN must be at least {} characters",
                self.min_length
            )));
        }
        if self.digits_only && !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(CryptoError::WeakPin(
                "PIN must contain only digits".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PinPolicy {
    fn default() -> Self {
        Self::NONE
    }
}
