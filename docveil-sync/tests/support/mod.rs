//! Shared helpers for sync integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use docveil_crypto::{IdentityKeyPair, generate_identity_keypair};
use docveil_oplog::Snapshot;
use docveil_sync::{
    BlobMeta, BlobStore, CredentialManager, DocumentSession, MemoryBlobStore, OpenParams,
    RemoteBlob, Renderer, StaticToken, StoreClient, SyncConfig, SyncError, SyncResult,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::Notify;

pub fn alice() -> &'static IdentityKeyPair {
    static KEY: OnceLock<IdentityKeyPair> = OnceLock::new();
    KEY.get_or_init(|| generate_identity_keypair().unwrap())
}

pub fn bob() -> &'static IdentityKeyPair {
    static KEY: OnceLock<IdentityKeyPair> = OnceLock::new();
    KEY.get_or_init(|| generate_identity_keypair().unwrap())
}

pub fn client(store: Arc<dyn BlobStore>) -> StoreClient {
    let credentials = CredentialManager::new(Arc::new(StaticToken::new("test-token")));
    StoreClient::new(store, Arc::new(credentials))
}

/// Creates a new document owned by alice.
pub async fn open_new(store: Arc<dyn BlobStore>) -> Arc<DocumentSession> {
    let session = DocumentSession::open(
        &client(store),
        alice(),
        OpenParams::new("doc-1", "alice").with_client_id("alice-client"),
        &SyncConfig::default(),
    )
    .await
    .unwrap();
    Arc::new(session)
}

/// Opens an existing blob as `member`.
pub async fn open_existing(
    store: Arc<dyn BlobStore>,
    identity: &IdentityKeyPair,
    member: &str,
    remote_id: &str,
) -> SyncResult<DocumentSession> {
    DocumentSession::open(
        &client(store),
        identity,
        OpenParams::new("doc-1", member)
            .with_remote_id(remote_id)
            .with_client_id(format!("{member}-client")),
        &SyncConfig::default(),
    )
    .await
}

/// Renderer that records every rendered text.
#[derive(Default)]
pub struct RecordingRenderer {
    pub rendered: Mutex<Vec<String>>,
}

impl Renderer for RecordingRenderer {
    fn render(&self, snapshot: &Snapshot) {
        self.rendered.lock().unwrap().push(snapshot.text.clone());
    }
}

/// Store whose reads block until released, for observing in-flight cycles.
#[derive(Default)]
pub struct GatedStore {
    pub inner: MemoryBlobStore,
    pub read_entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl BlobStore for GatedStore {
    async fn read(&self, token: &str, id: &str) -> SyncResult<RemoteBlob> {
        self.read_entered.notify_one();
        self.release.notified().await;
        self.inner.read(token, id).await
    }

    async fn create(&self, token: &str, name: &str) -> SyncResult<String> {
        self.inner.create(token, name).await
    }

    async fn update(&self, token: &str, id: &str, text: &str) -> SyncResult<BlobMeta> {
        self.inner.update(token, id, text).await
    }
}

/// Store whose updates can be switched to fail while reads keep working.
#[derive(Default)]
pub struct FailingWrites {
    pub inner: MemoryBlobStore,
    pub fail_updates: AtomicBool,
}

#[async_trait]
impl BlobStore for FailingWrites {
    async fn read(&self, token: &str, id: &str) -> SyncResult<RemoteBlob> {
        self.inner.read(token, id).await
    }

    async fn create(&self, token: &str, name: &str) -> SyncResult<String> {
        self.inner.create(token, name).await
    }

    async fn update(&self, token: &str, id: &str, text: &str) -> SyncResult<BlobMeta> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(SyncError::Transport("write rejected".into()));
        }
        self.inner.update(token, id, text).await
    }
}
