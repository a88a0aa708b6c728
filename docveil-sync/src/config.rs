//! Sync configuration.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a document sync session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Delay after the last local edit before a push runs (milliseconds).
    pub push_debounce_ms: u64,

    /// Interval between pulls of the remote blob (milliseconds).
    pub poll_interval_ms: u64,

    /// Prefix of the remote blob name; the document id and `.json` follow.
    pub blob_name_prefix: String,

    /// Retry delay for a push that failed with a recoverable error (milliseconds).
    pub push_retry_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            push_debounce_ms: 600,
            poll_interval_ms: 2_500,
            blob_name_prefix: "E2EE_Doc_".to_string(),
            push_retry_ms: 2_500,
        }
    }
}

impl SyncConfig {
    /// Parses a (possibly partial) JSON config; missing fields use defaults.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the scheduler cannot run with.
    pub fn validate(&self) -> SyncResult<()> {
        if self.push_debounce_ms == 0 {
            return Err(SyncError::Config("push_debounce_ms must be > 0".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(SyncError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.push_retry_ms == 0 {
            return Err(SyncError::Config("push_retry_ms must be > 0".into()));
        }
        if self.blob_name_prefix.contains('/') {
            return Err(SyncError::Config(
                "blob_name_prefix must not contain '/'".into(),
            ));
        }
        Ok(())
    }

    pub fn push_debounce(&self) -> Duration {
        Duration::from_millis(self.push_debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn push_retry(&self) -> Duration {
        Duration::from_millis(self.push_retry_ms)
    }

    /// Name of the remote blob holding `doc_id`.
    pub fn blob_name(&self, doc_id: &str) -> String {
        format!("{}{doc_id}.json", self.blob_name_prefix)
    }
}
