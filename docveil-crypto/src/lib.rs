//! Encryption layer for docveil.
//!
//! Provides client-side end-to-end encryption for collaborative documents:
//! - AES-256-GCM envelopes with a fresh random IV per call
//! - RSA-OAEP (2048, SHA-256) identity keys for sharing document keys
//! - PBKDF2-HMAC-SHA256 PIN protection of the identity private key
//!
//! # Architecture
//!
//! 1. **Document key**: a random 256-bit [`SymmetricKey`], one per document.
//!    All document content is encrypted under it as an [`Envelope`].
//!
//! 2. **Identity keypair**: each member holds an RSA keypair. The document
//!    key is wrapped under every member's public key and the wrapped copies
//!    form the document's keyring.
//!
//! 3. **PIN**: the identity private key is only persisted encrypted under a
//!    key derived from the member's PIN.

mod cipher;
mod error;
pub mod identity;
mod key;
pub mod pin;

pub use cipher::{
    CellEnvelope, Envelope, NONCE_SIZE, TAG_SIZE, decrypt, decrypt_bytes, decrypt_cell, encrypt,
    encrypt_bytes, encrypt_cell,
};
pub use error::{CryptoError, CryptoResult};
pub use identity::{
    IdentityKeyPair, IdentityPrivateKey, IdentityPublicKey, generate_identity_keypair,
    unwrap_key, unwrap_key_base64, wrap_key, wrap_key_base64,
};
pub use key::{KEY_SIZE, KdfParams, SALT_SIZE, Salt, SymmetricKey, derive_key, generate_symmetric_key};
pub use pin::{PinPolicy, PinProtectedPrivateKey, decrypt_private_key, encrypt_private_key};
