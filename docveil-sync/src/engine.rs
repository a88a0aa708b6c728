//! Push/pull cycles for one document session.
//!
//! The engine owns no timers; [`crate::scheduler`] decides when to call
//! [`SyncEngine::push`] and [`SyncEngine::pull`]. A single in-flight flag
//! covers both directions: a cycle requested while another one runs is
//! skipped, not queued.

use crate::error::{SyncError, SyncResult};
use crate::session::DocumentSession;
use crate::store::StoreClient;
use crate::types::EncryptedDocument;
use docveil_crypto::{decrypt, encrypt_bytes};
use docveil_oplog::{DocumentPayload, LastWriterWins, MergeStrategy, Snapshot, apply_remote};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Receives the new snapshot after a remote change has been installed.
pub trait Renderer: Send + Sync {
    fn render(&self, snapshot: &Snapshot);
}

/// Whether a cycle is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// The encrypted document was written at this local version.
    Uploaded { version: u64 },
    /// Content identical to the last uploaded or pulled content.
    Unchanged,
    /// Another cycle was in flight.
    Skipped,
    /// The session was torn down while the upload was pending.
    Discarded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PullOutcome {
    /// Remote content replaced the local state. `version` is the local
    /// counter after the replacement, not a version read from the remote.
    Applied { version: u64 },
    /// Remote text is byte-identical to what was last observed.
    Unchanged,
    /// Remote blob has no content yet.
    Empty,
    /// Another cycle was in flight.
    Skipped,
    /// The session was torn down while the read was pending.
    Discarded,
}

#[derive(Default)]
struct Markers {
    /// Digest of the last content uploaded or installed from the remote.
    last_digest: Option<String>,
    /// Blob text last written or read.
    last_remote_text: Option<String>,
}

/// Clears the in-flight flag when a cycle ends, on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Synchronizes a [`DocumentSession`] with its remote blob.
pub struct SyncEngine {
    session: Arc<DocumentSession>,
    client: StoreClient,
    merge: Box<dyn MergeStrategy>,
    renderer: Option<Arc<dyn Renderer>>,
    in_flight: AtomicBool,
    torn_down: AtomicBool,
    markers: Mutex<Markers>,
}

impl SyncEngine {
    /// Creates an engine using last-writer-wins merging.
    pub fn new(session: Arc<DocumentSession>, client: StoreClient) -> Self {
        let (opened_text, opened_digest) = session.opened_markers();
        Self {
            session,
            client,
            merge: Box::new(LastWriterWins),
            renderer: None,
            in_flight: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
            markers: Mutex::new(Markers {
                last_digest: opened_digest,
                last_remote_text: Some(opened_text),
            }),
        }
    }

    pub fn with_merge_strategy(mut self, merge: Box<dyn MergeStrategy>) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn session(&self) -> &Arc<DocumentSession> {
        &self.session
    }

    pub fn state(&self) -> SyncState {
        if self.in_flight.load(Ordering::Acquire) {
            SyncState::Syncing
        } else {
            SyncState::Idle
        }
    }

    /// Stops the engine from starting new cycles. Cycles already awaiting
    /// the store finish, but their results are discarded.
    pub fn teardown(&self) {
        if !self.torn_down.swap(true, Ordering::AcqRel) {
            info!("sync engine for {} torn down", self.session.doc_id());
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Encrypts and uploads the local state if it changed.
    pub async fn push(&self) -> SyncResult<PushOutcome> {
        if self.is_torn_down() {
            return Err(SyncError::SessionClosed);
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("push skipped, cycle in flight");
            return Ok(PushOutcome::Skipped);
        };

        let (payload, digest) = self.session.content_digest()?;
        if self.markers.lock().last_digest.as_deref() == Some(digest.as_str()) {
            return Ok(PushOutcome::Unchanged);
        }

        let version = self.session.version();
        let doc = EncryptedDocument {
            cipher: Some(encrypt_bytes(self.session.key(), &payload)?),
            ..EncryptedDocument::empty(self.session.keyring())
        };
        let text = doc.to_json()?;

        if let Err(e) = self.client.update(self.session.remote_id(), &text).await {
            warn!("push of {} failed: {e}", self.session.doc_id());
            return Err(e);
        }
        if self.is_torn_down() {
            return Ok(PushOutcome::Discarded);
        }

        let mut markers = self.markers.lock();
        markers.last_digest = Some(digest);
        markers.last_remote_text = Some(text);
        debug!("pushed {} at v{version}", self.session.doc_id());
        Ok(PushOutcome::Uploaded { version })
    }

    /// Fetches the remote blob and installs it if it changed.
    pub async fn pull(&self) -> SyncResult<PullOutcome> {
        if self.is_torn_down() {
            return Err(SyncError::SessionClosed);
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("pull skipped, cycle in flight");
            return Ok(PullOutcome::Skipped);
        };

        let blob = match self.client.read(self.session.remote_id()).await {
            Ok(blob) => blob,
            Err(e) => {
                warn!("pull of {} failed: {e}", self.session.doc_id());
                return Err(e);
            }
        };
        if self.is_torn_down() {
            return Ok(PullOutcome::Discarded);
        }
        if self.markers.lock().last_remote_text.as_deref() == Some(blob.text.as_str()) {
            return Ok(PullOutcome::Unchanged);
        }

        // Nothing local changes until the remote content has authenticated
        // under the document key.
        let doc = EncryptedDocument::parse(&blob.text)?;
        let Some(ref cipher) = doc.cipher else {
            self.markers.lock().last_remote_text = Some(blob.text);
            return Ok(PullOutcome::Empty);
        };
        let payload: DocumentPayload = decrypt(cipher, self.session.key())?;

        let added = self.session.merge_keyring(&doc.keyring);
        if added > 0 {
            debug!("learned {added} keyring entries from remote");
        }

        let snapshot = self.session.with_state(|state| {
            apply_remote(state, payload, self.merge.as_ref());
            state.snapshot().clone()
        });
        let (_, digest) = self.session.content_digest()?;
        {
            let mut markers = self.markers.lock();
            markers.last_digest = Some(digest);
            markers.last_remote_text = Some(blob.text);
        }

        debug!(
            "applied remote v{} to {} ({})",
            snapshot.version,
            self.session.doc_id(),
            self.merge.name()
        );
        if let Some(ref renderer) = self.renderer {
            renderer.render(&snapshot);
        }
        Ok(PullOutcome::Applied {
            version: snapshot.version,
        })
    }
}
