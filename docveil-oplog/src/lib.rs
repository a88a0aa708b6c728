//! Append-only edit log for docveil documents.
//!
//! A document is an ordered list of insert/delete [`Operation`]s. Its text
//! is never stored on its own: [`DocumentState::materialize`] replays the
//! log from the empty string, so the snapshot is a pure function of the
//! operation sequence.
//!
//! No operational-transform merge happens here. Remote changes are
//! installed through a [`MergeStrategy`], last-writer-wins by default.

pub mod merge;
mod operation;
mod state;

pub use merge::{LastWriterWins, MergeStrategy, apply_remote};
pub use operation::{DocumentPayload, OpKind, Operation, Snapshot};
pub use state::DocumentState;
