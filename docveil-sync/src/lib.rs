//! Document sync for docveil.
//!
//! Keeps a locally edited document in step with an encrypted JSON blob in
//! remote storage that only ever sees ciphertext.
//!
//! - [`DocumentSession`]: an open document with its key and op log
//! - [`SyncEngine`]: push and pull cycles against a [`BlobStore`]
//! - [`SyncScheduler`]: debounced pushes and periodic pulls on a tokio task
//! - [`CryptoService`]: typed request dispatch for host integrations

pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod keyring;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod store;
pub mod types;

pub use config::SyncConfig;
pub use credentials::{CredentialManager, CredentialProvider, StaticToken};
pub use engine::{PullOutcome, PushOutcome, Renderer, SyncEngine, SyncState};
pub use error::{SyncError, SyncResult};
pub use keyring::Keyring;
pub use scheduler::{SyncHandle, SyncScheduler};
pub use service::{CryptoService, Request, Response};
pub use session::{DocumentSession, OpenParams};
pub use store::{BlobStore, MemoryBlobStore, StoreClient};
pub use types::{BlobMeta, EncryptedDocument, FORMAT_VERSION, RemoteBlob};

/// Installs a stderr `tracing` subscriber filtered by `RUST_LOG`
/// (default `info`). Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
