//! An open document: its key, keyring and local op log.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::keyring::Keyring;
use crate::store::StoreClient;
use crate::types::EncryptedDocument;
use docveil_crypto::{
    IdentityKeyPair, IdentityPublicKey, SymmetricKey, decrypt, generate_symmetric_key,
};
use docveil_oplog::{DocumentPayload, DocumentState, Operation, Snapshot};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

/// What to open.
#[derive(Clone, Debug)]
pub struct OpenParams {
    /// Host-side document identifier; used to name a newly created blob.
    pub doc_id: String,
    /// Member id this client's identity is registered under in keyrings.
    pub member_id: String,
    /// Blob id of an existing document. `None` creates a new blob.
    pub remote_id: Option<String>,
    /// Client id stamped on local operations. Random when `None`.
    pub client_id: Option<String>,
}

impl OpenParams {
    pub fn new(doc_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            member_id: member_id.into(),
            remote_id: None,
            client_id: None,
        }
    }

    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }
}

/// State of one open document.
///
/// Locks are only held for in-memory work and never across an await.
pub struct DocumentSession {
    doc_id: String,
    remote_id: String,
    member_id: String,
    key: SymmetricKey,
    keyring: Mutex<Keyring>,
    state: Mutex<DocumentState>,
    opened_text: String,
    opened_digest: Option<String>,
}

impl std::fmt::Debug for DocumentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSession")
            .field("doc_id", &self.doc_id)
            .field("remote_id", &self.remote_id)
            .field("member_id", &self.member_id)
            .finish_non_exhaustive()
    }
}

impl DocumentSession {
    /// Opens (or creates) a document.
    ///
    /// - No `remote_id`: a blob named after `doc_id` is created and seeded
    ///   with a fresh document key wrapped for this member.
    /// - Existing blob with an empty keyring and no content: bootstrapped
    ///   the same way.
    /// - Existing blob without an entry for this member:
    ///   `SyncError::MissingKeyringEntry`.
    ///
    /// A blob that fails to decrypt is reported as
    /// `SyncError::Integrity`; an unknown id as `SyncError::NotFound`.
    pub async fn open(
        client: &StoreClient,
        identity: &IdentityKeyPair,
        params: OpenParams,
        config: &SyncConfig,
    ) -> SyncResult<Self> {
        let client_id = params
            .client_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let (remote_id, text) = match params.remote_id {
            Some(ref id) => {
                let blob = client.read(id).await?;
                (id.clone(), blob.text)
            }
            None => {
                let id = client.create(&config.blob_name(&params.doc_id)).await?;
                info!("created blob {id} for document {}", params.doc_id);
                (id, String::new())
            }
        };

        let doc = EncryptedDocument::parse(&text)?;
        if doc.keyring.is_empty() && doc.cipher.is_none() {
            return Self::bootstrap(client, identity, params, remote_id, client_id).await;
        }

        let key = doc
            .keyring
            .unwrap_for(&params.member_id, &identity.private)?;
        let state = match doc.cipher {
            Some(ref cipher) => {
                let payload: DocumentPayload = decrypt(cipher, &key)?;
                DocumentState::from_payload(client_id, payload)
            }
            None => DocumentState::with_client_id(client_id),
        };

        let mut session = Self::assemble(params, remote_id, key, doc.keyring, state, text);
        if doc.cipher.is_some() {
            session.opened_digest = Some(session.content_digest()?.1);
        }
        debug!(
            "opened document {} at v{}",
            session.doc_id,
            session.version()
        );
        Ok(session)
    }

    async fn bootstrap(
        client: &StoreClient,
        identity: &IdentityKeyPair,
        params: OpenParams,
        remote_id: String,
        client_id: String,
    ) -> SyncResult<Self> {
        let key = generate_symmetric_key();
        let mut keyring = Keyring::default();
        keyring.add_member(params.member_id.clone(), &identity.public, &key)?;

        let text = EncryptedDocument::empty(keyring.clone()).to_json()?;
        client.update(&remote_id, &text).await?;
        info!("initialized keyring for document {}", params.doc_id);

        let state = DocumentState::with_client_id(client_id);
        Ok(Self::assemble(params, remote_id, key, keyring, state, text))
    }

    fn assemble(
        params: OpenParams,
        remote_id: String,
        key: SymmetricKey,
        keyring: Keyring,
        state: DocumentState,
        opened_text: String,
    ) -> Self {
        Self {
            doc_id: params.doc_id,
            remote_id,
            member_id: params.member_id,
            key,
            keyring: Mutex::new(keyring),
            state: Mutex::new(state),
            opened_text,
            opened_digest: None,
        }
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    /// Blob id in the store.
    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }

    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    pub fn record_insert(&self, position: usize, text: impl Into<String>) -> Operation {
        self.state.lock().record_insert(position, text).clone()
    }

    pub fn record_delete(&self, position: usize, count: usize) -> Operation {
        self.state.lock().record_delete(position, count).clone()
    }

    /// Materializes and returns the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().materialize().clone()
    }

    pub fn text(&self) -> String {
        self.snapshot().text
    }

    pub fn version(&self) -> u64 {
        self.state.lock().version()
    }

    /// Wraps the document key for another member. Uploaded on the next push.
    pub fn add_member(
        &self,
        member_id: impl Into<String>,
        public_key: &IdentityPublicKey,
    ) -> SyncResult<()> {
        let member_id = member_id.into();
        self.keyring
            .lock()
            .add_member(member_id.clone(), public_key, &self.key)?;
        info!("added member {member_id} to document {}", self.doc_id);
        Ok(())
    }

    pub fn keyring(&self) -> Keyring {
        self.keyring.lock().clone()
    }

    pub(crate) fn key(&self) -> &SymmetricKey {
        &self.key
    }

    pub(crate) fn merge_keyring(&self, remote: &Keyring) -> usize {
        self.keyring.lock().merge_missing(remote)
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut DocumentState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Serialized plaintext payload and the identity digest of the content.
    ///
    /// The digest covers the payload and the keyring, so adding a member
    /// changes it even if the text did not.
    pub(crate) fn content_digest(&self) -> SyncResult<(Vec<u8>, String)> {
        let payload = serde_json::to_vec(&self.state.lock().payload())?;
        let keyring = serde_json::to_vec(&*self.keyring.lock())?;

        let mut hasher = Sha256::new();
        hasher.update(&payload);
        hasher.update(&keyring);
        Ok((payload, hex::encode(hasher.finalize())))
    }

    /// Blob text and content digest as observed when the session opened.
    pub(crate) fn opened_markers(&self) -> (String, Option<String>) {
        (self.opened_text.clone(), self.opened_digest.clone())
    }
}

