//! AES-256-GCM envelope encryption.
//!
//! Every call to [`encrypt`] draws a fresh 96-bit IV from the OS RNG. The
//! IV is carried next to the ciphertext in an [`Envelope`], base64-encoded,
//! so the envelope is the only thing a reader needs besides the key.
//!
//! Decryption is all-or-nothing: a tag mismatch returns
//! [`CryptoError::Authentication`] and no plaintext.

use crate::error::{CryptoError, CryptoResult};
use crate::key::SymmetricKey;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Size of the AES-GCM IV in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// An encrypted payload: base64 IV plus base64 ciphertext (tag appended).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub iv: String,
    pub ct: String,
}

/// Envelope variant used for single cells and fields, `{iv, data}` on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEnvelope {
    pub iv: String,
    pub data: String,
}

impl From<Envelope> for CellEnvelope {
    fn from(env: Envelope) -> Self {
        Self {
            iv: env.iv,
            data: env.ct,
        }
    }
}

impl From<CellEnvelope> for Envelope {
    fn from(cell: CellEnvelope) -> Self {
        Self {
            iv: cell.iv,
            ct: cell.data,
        }
    }
}

/// Raw IV and ciphertext, before base64 encoding.
pub(crate) struct Sealed {
    pub iv: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

pub(crate) fn seal(key: &SymmetricKey, plaintext: &[u8]) -> CryptoResult<Sealed> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(format!("AES-GCM encrypt: {e}")))?;

    Ok(Sealed {
        iv: nonce.into(),
        ciphertext,
    })
}

pub(crate) fn open(key: &SymmetricKey, iv: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    if iv.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidFormat(format!(
            "IV must be {NONCE_SIZE} bytes, got {}",
            iv.len()
        )));
    }
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::Authentication);
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::Authentication)
}

/// Encrypts raw bytes into an [`Envelope`].
pub fn encrypt_bytes(key: &SymmetricKey, plaintext: &[u8]) -> CryptoResult<Envelope> {
    let sealed = seal(key, plaintext)?;
    Ok(Envelope {
        iv: BASE64.encode(sealed.iv),
        ct: BASE64.encode(&sealed.ciphertext),
    })
}

/// Decrypts an [`Envelope`] into raw bytes.
pub fn decrypt_bytes(key: &SymmetricKey, envelope: &Envelope) -> CryptoResult<Vec<u8>> {
    let iv = BASE64.decode(&envelope.iv)?;
    let ciphertext = BASE64.decode(&envelope.ct)?;
    open(key, &iv, &ciphertext)
}

/// Serializes `payload` as JSON and encrypts it.
pub fn encrypt<T: Serialize + ?Sized>(payload: &T, key: &SymmetricKey) -> CryptoResult<Envelope> {
    let json = serde_json::to_vec(payload)?;
    encrypt_bytes(key, &json)
}

/// Decrypts an envelope and deserializes the JSON payload.
pub fn decrypt<T: DeserializeOwned>(envelope: &Envelope, key: &SymmetricKey) -> CryptoResult<T> {
    let plaintext = decrypt_bytes(key, envelope)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Encrypts a single cell or field value.
pub fn encrypt_cell<T: Serialize + ?Sized>(value: &T, key: &SymmetricKey) -> CryptoResult<CellEnvelope> {
    encrypt(value, key).map(CellEnvelope::from)
}

/// Decrypts a single cell or field value.
pub fn decrypt_cell<T: DeserializeOwned>(cell: &CellEnvelope, key: &SymmetricKey) -> CryptoResult<T> {
    decrypt(&Envelope::from(cell.clone()), key)
}
