//! Local document state: the op log plus its cached snapshot.

use crate::operation::{DocumentPayload, OpKind, Operation, Snapshot};
use tracing::warn;
use uuid::Uuid;

/// Append-only op log for one open document.
///
/// The cached snapshot always equals the replay of every operation, in
/// stored order, starting from the empty string.
#[derive(Clone, Debug)]
pub struct DocumentState {
    client_id: String,
    ops: Vec<Operation>,
    version: u64,
    snapshot: Snapshot,
}

impl DocumentState {
    /// Creates an empty state with a random client identifier.
    pub fn new() -> Self {
        Self::with_client_id(Uuid::new_v4().to_string())
    }

    /// Creates an empty state for a known client identifier.
    pub fn with_client_id(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ops: Vec::new(),
            version: 0,
            snapshot: Snapshot::default(),
        }
    }

    /// Builds a state from a decrypted payload.
    pub fn from_payload(client_id: impl Into<String>, payload: DocumentPayload) -> Self {
        let mut state = Self::with_client_id(client_id);
        state.replace_with(payload);
        state
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Current local version counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Last materialized snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Records an insert of `text` at `position`.
    pub fn record_insert(&mut self, position: usize, text: impl Into<String>) -> &Operation {
        self.push(OpKind::Insert { text: text.into() }, position)
    }

    /// Records a delete of `count` characters at `position`.
    pub fn record_delete(&mut self, position: usize, count: usize) -> &Operation {
        self.push(OpKind::Delete { count }, position)
    }

    fn push(&mut self, kind: OpKind, position: usize) -> &Operation {
        self.version += 1;
        self.ops.push(Operation {
            kind,
            position,
            version: self.version,
            timestamp: chrono::Utc::now().timestamp_millis(),
            client_id: self.client_id.clone(),
        });
        &self.ops[self.ops.len() - 1]
    }

    /// Replays every operation from the empty string and caches the result.
    pub fn materialize(&mut self) -> &Snapshot {
        let mut text = String::new();
        for op in &self.ops {
            op.apply(&mut text);
        }
        self.snapshot = Snapshot {
            version: self.version,
            text,
        };
        &self.snapshot
    }

    /// Materializes and returns the payload that gets encrypted on push.
    pub fn payload(&mut self) -> DocumentPayload {
        self.materialize();
        DocumentPayload {
            ops: self.ops.clone(),
            snapshot: Some(self.snapshot.clone()),
        }
    }

    /// Replaces the whole state with a payload received from the remote.
    ///
    /// The version counter continues from the highest version seen so that
    /// later local operations stay strictly increasing. The snapshot is
    /// recomputed from the ops; a mismatching remote snapshot is ignored.
    /// The resulting snapshot version is this local counter, which can be
    /// higher than any version carried by the remote ops.
    pub fn replace_with(&mut self, payload: DocumentPayload) {
        let remote_max = payload.ops.iter().map(|op| op.version).max().unwrap_or(0);
        let remote_snapshot = payload.snapshot;

        self.ops = payload.ops;
        self.version = self.version.max(remote_max);
        self.materialize();

        if let Some(remote) = remote_snapshot {
            if remote.text != self.snapshot.text {
                warn!(
                    "remote snapshot v{} disagrees with op replay, using replay",
                    remote.version
                );
            }
        }
    }
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new()
    }
}
