//! Edit operations and the decrypted document payload.

use serde::{Deserialize, Serialize};

/// What an operation does to the text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum OpKind {
    /// Splice `text` in at the operation's position.
    #[serde(rename = "ins")]
    Insert { text: String },
    /// Remove `count` characters starting at the operation's position.
    #[serde(rename = "del")]
    Delete { count: usize },
}

/// A single text edit.
///
/// Positions and counts are measured in Unicode scalar values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(flatten)]
    pub kind: OpKind,
    #[serde(rename = "at")]
    pub position: usize,
    #[serde(rename = "ver")]
    pub version: u64,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "ts")]
    pub timestamp: i64,
    #[serde(rename = "client")]
    pub client_id: String,
}

impl Operation {
    pub fn is_insert(&self) -> bool {
        matches!(self.kind, OpKind::Insert { .. })
    }

    /// Applies this operation to `text` in place.
    ///
    /// Out-of-range positions clamp to the end of the text, so an insert
    /// past the end appends and a delete past the end removes what exists.
    pub fn apply(&self, text: &mut String) {
        let start = byte_offset(text, self.position);
        match &self.kind {
            OpKind::Insert { text: inserted } => text.insert_str(start, inserted),
            OpKind::Delete { count } => {
                let end = byte_offset(text, self.position.saturating_add(*count));
                text.replace_range(start..end, "");
            }
        }
    }
}

fn byte_offset(text: &str, char_pos: usize) -> usize {
    text.char_indices()
        .nth(char_pos)
        .map_or(text.len(), |(idx, _)| idx)
}

/// Materialized text at a version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "ver")]
    pub version: u64,
    pub text: String,
}

/// The plaintext carried inside a document's encrypted `cipher` field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub ops: Vec<Operation>,
    #[serde(default)]
    pub snapshot: Option<Snapshot>,
}
