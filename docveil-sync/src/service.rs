//! Typed request dispatch for host integrations.
//!
//! Hosts that talk to the core over a message channel send a [`Request`]
//! and get back a [`Response`]. Both serialize as JSON objects tagged with
//! a `type` field. Errors never escape [`CryptoService::handle`]; they come
//! back as [`Response::Error`].

use crate::credentials::CredentialManager;
use crate::error::{SyncError, SyncResult};
use docveil_crypto::{
    CellEnvelope, IdentityPublicKey, SymmetricKey, decrypt_cell, encrypt_cell,
    generate_symmetric_key, wrap_key_base64,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    /// Reports whether a bearer token is cached.
    CheckAuth,
    /// Fetches a bearer token from the credential provider.
    Login,
    /// Generates and caches a new key for a sheet.
    GenerateKey { sheet_id: String },
    /// Caches a base64 key for a sheet.
    ImportKey { sheet_id: String, key: String },
    ExportKey { sheet_id: String },
    EncryptCell { sheet_id: String, value: Value },
    DecryptCell { sheet_id: String, cell: CellEnvelope },
    /// Wraps a sheet's key for a member's base64 SPKI public key.
    WrapKeyFor { sheet_id: String, public_key: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    Auth { authenticated: bool },
    Key { sheet_id: String, key: String },
    Cell { cell: CellEnvelope },
    Value { value: Value },
    Wrapped { wrapped: String },
    Ok,
    Error { message: String },
}

/// Stateful handler for [`Request`]s. Keys are cached per sheet id.
pub struct CryptoService {
    credentials: Arc<CredentialManager>,
    keys: RwLock<HashMap<String, SymmetricKey>>,
}

impl CryptoService {
    pub fn new(credentials: Arc<CredentialManager>) -> Self {
        Self {
            credentials,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Handles a request, folding any error into [`Response::Error`].
    pub async fn handle(&self, request: Request) -> Response {
        match self.try_handle(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("request failed: {e}");
                Response::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    pub async fn try_handle(&self, request: Request) -> SyncResult<Response> {
        match request {
            Request::CheckAuth => Ok(Response::Auth {
                authenticated: self.credentials.has_token().await,
            }),
            Request::Login => {
                self.credentials.refresh().await?;
                Ok(Response::Auth {
                    authenticated: true,
                })
            }
            Request::GenerateKey { sheet_id } => {
                let key = generate_symmetric_key();
                let encoded = key.to_base64();
                self.keys.write().await.insert(sheet_id.clone(), key);
                debug!("generated key for sheet {sheet_id}");
                Ok(Response::Key {
                    sheet_id,
                    key: encoded,
                })
            }
            Request::ImportKey { sheet_id, key } => {
                let key = SymmetricKey::from_base64(&key)?;
                self.keys.write().await.insert(sheet_id, key);
                Ok(Response::Ok)
            }
            Request::ExportKey { sheet_id } => {
                let key = self.key_for(&sheet_id).await?.to_base64();
                Ok(Response::Key { sheet_id, key })
            }
            Request::EncryptCell { sheet_id, value } => {
                self.require_auth().await?;
                let key = self.key_for(&sheet_id).await?;
                Ok(Response::Cell {
                    cell: encrypt_cell(&value, &key)?,
                })
            }
            Request::DecryptCell { sheet_id, cell } => {
                self.require_auth().await?;
                let key = self.key_for(&sheet_id).await?;
                Ok(Response::Value {
                    value: decrypt_cell(&cell, &key)?,
                })
            }
            Request::WrapKeyFor {
                sheet_id,
                public_key,
            } => {
                let key = self.key_for(&sheet_id).await?;
                let recipient = IdentityPublicKey::from_base64(&public_key)?;
                Ok(Response::Wrapped {
                    wrapped: wrap_key_base64(&key, &recipient)?,
                })
            }
        }
    }

    async fn require_auth(&self) -> SyncResult<()> {
        if self.credentials.has_token().await {
            Ok(())
        } else {
            Err(SyncError::AuthRequired)
        }
    }

    async fn key_for(&self, sheet_id: &str) -> SyncResult<SymmetricKey> {
        self.keys
            .read()
            .await
            .get(sheet_id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("key for sheet {sheet_id}")))
    }
}
