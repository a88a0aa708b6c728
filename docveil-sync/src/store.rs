//! Blob store contract, an in-memory store, and the authorized client.

use crate::credentials::CredentialManager;
use crate::error::{SyncError, SyncResult};
use crate::types::{BlobMeta, RemoteBlob};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Remote storage for encrypted document blobs.
///
/// Implementations return [`SyncError::Unauthorized`] when the bearer
/// token is rejected, [`SyncError::NotFound`] for unknown ids and
/// [`SyncError::Transport`] for everything else that went wrong in transit.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, token: &str, id: &str) -> SyncResult<RemoteBlob>;

    /// Creates an empty blob and returns its id.
    async fn create(&self, token: &str, name: &str) -> SyncResult<String>;

    async fn update(&self, token: &str, id: &str, text: &str) -> SyncResult<BlobMeta>;
}

struct StoredBlob {
    meta: BlobMeta,
    text: String,
}

#[derive(Default)]
struct MemoryInner {
    blobs: HashMap<String, StoredBlob>,
    accepted_token: Option<String>,
    offline: bool,
    next_id: u64,
    revision: u64,
}

/// In-process [`BlobStore`].
///
/// Accepts any token unless one is pinned with [`Self::accept_only`].
/// [`Self::set_offline`] makes every call fail with a transport error.
#[derive(Default)]
pub struct MemoryBlobStore {
    inner: RwLock<MemoryInner>,
    reads: AtomicUsize,
    updates: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every token other than `token` with `Unauthorized`.
    pub async fn accept_only(&self, token: impl Into<String>) {
        self.inner.write().await.accepted_token = Some(token.into());
    }

    pub async fn set_offline(&self, offline: bool) {
        self.inner.write().await.offline = offline;
    }

    /// Number of successful reads.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of successful updates.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Current text of a blob, bypassing auth and counters.
    pub async fn get_raw(&self, id: &str) -> Option<String> {
        self.inner.read().await.blobs.get(id).map(|b| b.text.clone())
    }

    /// Overwrites a blob as another client would, bypassing auth and counters.
    pub async fn put_raw(&self, id: &str, text: impl Into<String>) -> SyncResult<()> {
        let mut inner = self.inner.write().await;
        inner.revision += 1;
        let etag = format!("r{}", inner.revision);
        let blob = inner
            .blobs
            .get_mut(id)
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;
        blob.text = text.into();
        blob.meta.etag = etag;
        blob.meta.modified_time = Utc::now();
        Ok(())
    }

    fn check(inner: &MemoryInner, token: &str) -> SyncResult<()> {
        if inner.offline {
            return Err(SyncError::Transport("store offline".into()));
        }
        match inner.accepted_token {
            Some(ref accepted) if accepted != token => Err(SyncError::Unauthorized),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, token: &str, id: &str) -> SyncResult<RemoteBlob> {
        let inner = self.inner.read().await;
        Self::check(&inner, token)?;
        let blob = inner
            .blobs
            .get(id)
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(RemoteBlob {
            meta: blob.meta.clone(),
            text: blob.text.clone(),
        })
    }

    async fn create(&self, token: &str, name: &str) -> SyncResult<String> {
        let mut inner = self.inner.write().await;
        Self::check(&inner, token)?;
        inner.next_id += 1;
        inner.revision += 1;
        let id = format!("blob-{}", inner.next_id);
        let meta = BlobMeta {
            id: id.clone(),
            name: name.to_string(),
            modified_time: Utc::now(),
            etag: format!("r{}", inner.revision),
        };
        inner.blobs.insert(
            id.clone(),
            StoredBlob {
                meta,
                text: String::new(),
            },
        );
        Ok(id)
    }

    async fn update(&self, token: &str, id: &str, text: &str) -> SyncResult<BlobMeta> {
        let mut inner = self.inner.write().await;
        Self::check(&inner, token)?;
        inner.revision += 1;
        let etag = format!("r{}", inner.revision);
        let blob = inner
            .blobs
            .get_mut(id)
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;
        blob.text = text.to_string();
        blob.meta.etag = etag;
        blob.meta.modified_time = Utc::now();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(blob.meta.clone())
    }
}

/// A [`BlobStore`] paired with the credentials used to call it.
///
/// Every call is retried once with a freshly fetched token when the store
/// answers `Unauthorized`.
#[derive(Clone)]
pub struct StoreClient {
    store: Arc<dyn BlobStore>,
    credentials: Arc<CredentialManager>,
}

impl StoreClient {
    pub fn new(store: Arc<dyn BlobStore>, credentials: Arc<CredentialManager>) -> Self {
        Self { store, credentials }
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    pub async fn read(&self, id: &str) -> SyncResult<RemoteBlob> {
        let token = self.credentials.bearer_token().await?;
        match self.store.read(&token, id).await {
            Err(SyncError::Unauthorized) => {
                let token = self.reauthorize().await?;
                self.store.read(&token, id).await
            }
            other => other,
        }
    }

    pub async fn create(&self, name: &str) -> SyncResult<String> {
        let token = self.credentials.bearer_token().await?;
        match self.store.create(&token, name).await {
            Err(SyncError::Unauthorized) => {
                let token = self.reauthorize().await?;
                self.store.create(&token, name).await
            }
            other => other,
        }
    }

    pub async fn update(&self, id: &str, text: &str) -> SyncResult<BlobMeta> {
        let token = self.credentials.bearer_token().await?;
        match self.store.update(&token, id, text).await {
            Err(SyncError::Unauthorized) => {
                let token = self.reauthorize().await?;
                self.store.update(&token, id, text).await
            }
            other => other,
        }
    }

    async fn reauthorize(&self) -> SyncResult<String> {
        warn!("bearer token rejected, retrying with a fresh one");
        self.credentials.invalidate().await;
        let token = self.credentials.refresh().await?;
        debug!("retrying store call");
        Ok(token)
    }
}
