//! Bearer credential lifecycle.
//!
//! A [`CredentialProvider`] knows how to obtain a fresh token. The
//! [`CredentialManager`] caches it and hands it to store calls; when the
//! store rejects a token the manager is invalidated and asked again.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Source of bearer tokens for the blob store.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Obtains a new token. Called when nothing is cached.
    async fn fetch_token(&self) -> SyncResult<String>;
}

/// Provider that always returns the same token.
#[derive(Clone, Debug)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn fetch_token(&self) -> SyncResult<String> {
        if self.0.is_empty() {
            return Err(SyncError::AuthRequired);
        }
        Ok(self.0.clone())
    }
}

/// Caches the current bearer token and refreshes it on demand.
pub struct CredentialManager {
    provider: Arc<dyn CredentialProvider>,
    token: RwLock<Option<String>>,
}

impl CredentialManager {
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            provider,
            token: RwLock::new(None),
        }
    }

    /// Returns the cached token, fetching one if needed.
    pub async fn bearer_token(&self) -> SyncResult<String> {
        {
            let token = self.token.read().await;
            if let Some(ref t) = *token {
                return Ok(t.clone());
            }
        }
        self.refresh().await
    }

    /// Forces a fetch from the provider.
    pub async fn refresh(&self) -> SyncResult<String> {
        let fresh = self.provider.fetch_token().await.map_err(|e| {
            warn!("credential fetch failed: {e}");
            e
        })?;
        debug!("bearer token refreshed");

        let mut token = self.token.write().await;
        *token = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drops the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        let mut token = self.token.write().await;
        *token = None;
    }

    /// Returns true if a token is cached.
    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }
}
