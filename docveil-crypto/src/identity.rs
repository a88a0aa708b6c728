//! RSA-OAEP identity keys and document key wrapping.
//!
//! Each member owns one 2048-bit RSA identity keypair. The public half is
//! distributed as SPKI DER (base64 over the wire); the private half is kept
//! as PKCS#8 DER and only ever persisted PIN-encrypted (see [`crate::pin`]).
//!
//! Document keys are shared by wrapping the raw 32 key bytes under a
//! member's public key with OAEP (SHA-256 digest and MGF1).

use crate::error::{CryptoError, CryptoResult};
use crate::key::{KEY_SIZE, SymmetricKey};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

/// RSA modulus size for identity keys.
pub const RSA_KEY_BITS: usize = 2048;

/// Public exponent for identity keys.
pub const RSA_PUBLIC_EXPONENT: u64 = 65_537;

/// A member's public identity key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityPublicKey(RsaPublicKey);

impl IdentityPublicKey {
    /// Encodes as SPKI DER.
    pub fn to_der(&self) -> CryptoResult<Vec<u8>> {
        self.0
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CryptoError::InvalidKey(format!("SPKI encode: {e}")))
    }

    /// Decodes from SPKI DER.
    pub fn from_der(der: &[u8]) -> CryptoResult<Self> {
        RsaPublicKey::from_public_key_der(der)
            .map(Self)
            .map_err(|e| CryptoError::InvalidKey(format!("SPKI decode: {e}")))
    }

    pub fn to_base64(&self) -> CryptoResult<String> {
        Ok(BASE64.encode(self.to_der()?))
    }

    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        Self::from_der(&BASE64.decode(encoded)?)
    }
}

/// A member's private identity key.
#[derive(Clone)]
pub struct IdentityPrivateKey(RsaPrivateKey);

impl IdentityPrivateKey {
    /// Encodes as PKCS#8 DER. The buffer is zeroized when dropped.
    pub fn to_pkcs8_der(&self) -> CryptoResult<Zeroizing<Vec<u8>>> {
        self.0
            .to_pkcs8_der()
            .map(|doc| Zeroizing::new(doc.as_bytes().to_vec()))
            .map_err(|e| CryptoError::InvalidKey(format!("PKCS#8 encode: {e}")))
    }

    /// Decodes from PKCS#8 DER.
    pub fn from_pkcs8_der(der: &[u8]) -> CryptoResult<Self> {
        RsaPrivateKey::from_pkcs8_der(der)
            .map(Self)
            .map_err(|e| CryptoError::InvalidKey(format!("PKCS#8 decode: {e}")))
    }

    /// Returns the matching public key.
    pub fn public_key(&self) -> IdentityPublicKey {
        IdentityPublicKey(self.0.to_public_key())
    }
}

impl std::fmt::Debug for IdentityPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IdentityPrivateKey([REDACTED])")
    }
}

impl PartialEq for IdentityPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// RSA-OAEP identity keypair.
#[derive(Clone, Debug)]
pub struct IdentityKeyPair {
    pub public: IdentityPublicKey,
    pub private: IdentityPrivateKey,
}

/// Generates a new 2048-bit RSA identity keypair (e = 65537).
pub fn generate_identity_keypair() -> CryptoResult<IdentityKeyPair> {
    let exponent = BigUint::from(RSA_PUBLIC_EXPONENT);
    let private = RsaPrivateKey::new_with_exp(&mut rand::rngs::OsRng, RSA_KEY_BITS, &exponent)
        .map_err(|e| CryptoError::KeyGeneration(format!("RSA: {e}")))?;
    let public = private.to_public_key();

    Ok(IdentityKeyPair {
        public: IdentityPublicKey(public),
        private: IdentityPrivateKey(private),
    })
}

/// Wraps a document key for a recipient with RSA-OAEP/SHA-256.
pub fn wrap_key(key: &SymmetricKey, recipient: &IdentityPublicKey) -> CryptoResult<Vec<u8>> {
    recipient
        .0
        .encrypt(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("RSA-OAEP wrap: {e}")))
}

/// Unwraps a document key with the recipient's private key.
///
/// A wrong private key or a corrupted ciphertext fails OAEP decoding and
/// is reported as [`CryptoError::Unwrap`]; a well-formed payload of the
/// wrong size is rejected with [`CryptoError::InvalidKeyLength`].
pub fn unwrap_key(wrapped: &[u8], recipient: &IdentityPrivateKey) -> CryptoResult<SymmetricKey> {
    let raw = Zeroizing::new(
        recipient
            .0
            .decrypt(Oaep::new::<Sha256>(), wrapped)
            .map_err(|e| CryptoError::Unwrap(e.to_string()))?,
    );

    if raw.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: raw.len(),
        });
    }
    SymmetricKey::from_slice(&raw)
}

/// Wraps a document key and base64-encodes it for a keyring entry.
pub fn wrap_key_base64(key: &SymmetricKey, recipient: &IdentityPublicKey) -> CryptoResult<String> {
    Ok(BASE64.encode(wrap_key(key, recipient)?))
}

/// Decodes and unwraps a base64 keyring entry.
pub fn unwrap_key_base64(
    wrapped: &str,
    recipient: &IdentityPrivateKey,
) -> CryptoResult<SymmetricKey> {
    unwrap_key(&BASE64.decode(wrapped)?, recipient)
}
