//! Reconciliation of local state with a remote payload.
//!
//! The sync engine hands every decrypted remote payload to a
//! [`MergeStrategy`] before installing it. The default strategy is
//! last-writer-wins at whole-document granularity: the remote payload
//! replaces the local one. Operations carry version and client ids, so a
//! finer-grained strategy can be plugged in without changing the wire format.

use crate::operation::DocumentPayload;
use crate::state::DocumentState;

/// Decides what payload to install when a remote change arrives.
pub trait MergeStrategy: Send + Sync {
    /// Returns the payload that should replace `local`.
    fn merge(&self, local: &DocumentState, remote: DocumentPayload) -> DocumentPayload;

    /// Human-readable name, used in logs.
    fn name(&self) -> &'static str;
}

/// Remote payload always wins. Concurrent local edits are discarded.
#[derive(Clone, Copy, Debug, Default)]
pub struct LastWriterWins;

impl MergeStrategy for LastWriterWins {
    fn merge(&self, _local: &DocumentState, remote: DocumentPayload) -> DocumentPayload {
        remote
    }

    fn name(&self) -> &'static str {
        "last-writer-wins"
    }
}

/// Merges `remote` into `local` using `strategy`.
pub fn apply_remote(
    local: &mut DocumentState,
    remote: DocumentPayload,
    strategy: &dyn MergeStrategy,
) {
    let merged = strategy.merge(local, remote);
    local.replace_with(merged);
}
