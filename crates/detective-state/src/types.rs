//! Persisted record types.

use serde::{Deserialize, Serialize};

/// Stored page metrics for one URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrlMetricsDocument {
    /// Hash of the URL; the table key.
    pub slug: String,
    /// The original URL, kept readable alongside its hash.
    pub title: String,
    /// Serialized page-metric array, newest first.
    pub content: String,
    /// Unix timestamp (seconds) of the last write.
    pub modified_at: u64,
}

/// A client's storage lock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockEntry {
    /// Unix timestamp (seconds) of the client's last stored submission.
    pub locked_at: u64,
    /// Unix timestamp (seconds) after which the entry is ignored.
    pub expires_at: u64,
}

impl LockEntry {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now
    }
}
