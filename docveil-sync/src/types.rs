//! Wire types for the encrypted document blob.

use crate::error::{SyncError, SyncResult};
use crate::keyring::Keyring;
use chrono::{DateTime, Utc};
use docveil_crypto::Envelope;
use serde::{Deserialize, Serialize};

/// Format version written into every document blob.
pub const FORMAT_VERSION: u32 = 1;

/// Metadata the blob store reports for a stored blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMeta {
    pub id: String,
    pub name: String,
    pub modified_time: DateTime<Utc>,
    /// Opaque revision tag; changes on every write.
    pub etag: String,
}

/// A blob as read from the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteBlob {
    pub meta: BlobMeta,
    pub text: String,
}

/// The JSON document persisted in the blob store.
///
/// `cipher` is absent until the first push. `keyring` maps member ids to
/// the document key wrapped under that member's identity public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedDocument {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher: Option<Envelope>,
    #[serde(default)]
    pub keyring: Keyring,
}

impl EncryptedDocument {
    /// A document with no content yet.
    pub fn empty(keyring: Keyring) -> Self {
        Self {
            version: FORMAT_VERSION,
            cipher: None,
            keyring,
        }
    }

    /// Parses blob text. Empty text is a freshly created blob.
    pub fn parse(text: &str) -> SyncResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::empty(Keyring::default()));
        }
        let doc: Self = serde_json::from_str(text)?;
        if doc.version != FORMAT_VERSION {
            return Err(SyncError::UnsupportedFormat(doc.version));
        }
        Ok(doc)
    }

    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
