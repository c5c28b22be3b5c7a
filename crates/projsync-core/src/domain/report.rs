//! Per-session sync outcome

use serde::{Deserialize, Serialize};

use super::newtypes::{RelativePath, SessionId};
use super::records::Scope;

/// Kind of per-file operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    /// Uploading a new or changed file
    Upload,
    /// Deleting a stale entry ahead of its replacement upload
    Replace,
    /// Deleting an entry with no local counterpart
    Delete,
    /// Reading local content before upload
    Read,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Upload => write!(f, "upload"),
            FileOperation::Replace => write!(f, "replace"),
            FileOperation::Delete => write!(f, "delete"),
            FileOperation::Read => write!(f, "read"),
        }
    }
}

/// A single file operation that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: RelativePath,
    pub operation: FileOperation,
    pub error: String,
    /// Whether the final error was transient (retries exhausted)
    pub transient: bool,
}

impl std::fmt::Display for FileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.operation, self.path, self.error)
    }
}

/// Result of reconciling one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub session_id: SessionId,
    pub scope: Scope,
    /// Local files examined
    pub examined: u64,
    pub unchanged: u64,
    /// Successful uploads, replacements included
    pub uploaded: u64,
    /// Stale entries deleted ahead of their replacement upload
    pub replaced: u64,
    /// Entries deleted because the file no longer exists locally
    pub deleted: u64,
    /// Uploads whose content changed after the scan; the content read at
    /// upload time is what was sent
    #[serde(default)]
    pub changed_during_sync: u64,
    pub failures: Vec<FileFailure>,
    /// True when the session stopped early because it was cancelled
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl SyncReport {
    /// Creates an empty report for a session
    pub fn new(session_id: SessionId, scope: Scope) -> Self {
        Self {
            session_id,
            scope,
            examined: 0,
            unchanged: 0,
            uploaded: 0,
            replaced: 0,
            deleted: 0,
            changed_during_sync: 0,
            failures: Vec::new(),
            cancelled: false,
            duration_ms: 0,
        }
    }

    pub fn failed(&self) -> u64 {
        self.failures.len() as u64
    }

    /// True when every planned operation succeeded and nothing was cut short
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    pub fn record_failure(&mut self, failure: FileFailure) {
        self.failures.push(failure);
    }
}
