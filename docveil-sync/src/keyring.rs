//! Per-member keyring: the document key wrapped for each member.

use crate::error::{SyncError, SyncResult};
use docveil_crypto::{
    CryptoResult, IdentityPrivateKey, IdentityPublicKey, SymmetricKey, unwrap_key_base64,
    wrap_key_base64,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Member id → base64 RSA-OAEP wrapped document key.
///
/// Serializes as a plain JSON object. Ordered so the serialized form is
/// stable across clients.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyring(BTreeMap<String, String>);

impl Keyring {
    /// Wraps `key` under `public_key` and stores it for `member_id`,
    /// replacing any previous entry.
    pub fn add_member(
        &mut self,
        member_id: impl Into<String>,
        public_key: &IdentityPublicKey,
        key: &SymmetricKey,
    ) -> CryptoResult<()> {
        let wrapped = wrap_key_base64(key, public_key)?;
        self.0.insert(member_id.into(), wrapped);
        Ok(())
    }

    /// Recovers the document key from `member_id`'s entry.
    pub fn unwrap_for(
        &self,
        member_id: &str,
        private_key: &IdentityPrivateKey,
    ) -> SyncResult<SymmetricKey> {
        let wrapped = self
            .0
            .get(member_id)
            .ok_or_else(|| SyncError::MissingKeyringEntry(member_id.to_string()))?;
        Ok(unwrap_key_base64(wrapped, private_key)?)
    }

    pub fn contains(&self, member_id: &str) -> bool {
        self.0.contains_key(member_id)
    }

    pub fn get(&self, member_id: &str) -> Option<&str> {
        self.0.get(member_id).map(String::as_str)
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copies entries from `other` for members not present here.
    /// Returns how many were added.
    pub fn merge_missing(&mut self, other: &Keyring) -> usize {
        let mut added = 0;
        for (member, wrapped) in &other.0 {
            if !self.0.contains_key(member) {
                self.0.insert(member.clone(), wrapped.clone());
                added += 1;
            }
        }
        added
    }
}
