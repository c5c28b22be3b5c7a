//! SyncSession domain entity
//!
//! A SyncSession tracks one sync of one local root against one remote
//! scope. It owns the local inventory and the remote listing for that run
//! and is discarded when the run ends; sessions are never persisted.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::SessionId;
use super::records::{LocalInventory, RemoteFileEntry, Scope};
use super::report::SyncReport;

/// Status of a sync session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Walking the local tree
    Scanning,
    /// Fetching the remote listing
    Listing,
    /// Executing the convergence plan
    Reconciling,
    /// Finished; per-file failures may still be present in the report
    Completed,
    /// Aborted by a session-fatal error
    Failed(String),
    /// Stopped early by the caller
    Cancelled,
}

impl SessionStatus {
    /// Returns true if the session has reached a terminal state
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed(_) | SessionStatus::Cancelled
        )
    }

    fn name(&self) -> &'static str {
        match self {
            SessionStatus::Scanning => "scanning",
            SessionStatus::Listing => "listing",
            SessionStatus::Reconciling => "reconciling",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed(_) => "failed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Failed(msg) => write!(f, "failed: {}", msg),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// One sync of a local root against a remote scope
#[derive(Debug, Clone)]
pub struct SyncSession {
    id: SessionId,
    scope: Scope,
    root: PathBuf,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    status: SessionStatus,
    inventory: Option<LocalInventory>,
    remote: Vec<RemoteFileEntry>,
}

impl SyncSession {
    /// Creates a new session in the Scanning state
    pub fn new(scope: Scope, root: impl Into<PathBuf>) -> Self {
        Self {
            id: SessionId::new(),
            scope,
            root: root.into(),
            started_at: Utc::now(),
            completed_at: None,
            status: SessionStatus::Scanning,
            inventory: None,
            remote: Vec::new(),
        }
    }

    // --- Getters ---

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// The local inventory, once scanning has finished
    pub fn inventory(&self) -> Option<&LocalInventory> {
        self.inventory.as_ref()
    }

    /// The remote listing, once listing has finished
    pub fn remote(&self) -> &[RemoteFileEntry] {
        &self.remote
    }

    /// Returns the duration of the session (so far or total)
    pub fn duration(&self) -> chrono::Duration {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        end - self.started_at
    }

    // --- Transitions ---

    fn transition(&mut self, expected: &SessionStatus, next: SessionStatus) -> Result<(), DomainError> {
        if &self.status != expected {
            return Err(DomainError::InvalidState {
                from: self.status.name().to_string(),
                to: next.name().to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Stores the local inventory and moves to Listing
    pub fn set_inventory(&mut self, inventory: LocalInventory) -> Result<(), DomainError> {
        self.transition(&SessionStatus::Scanning, SessionStatus::Listing)?;
        self.inventory = Some(inventory);
        Ok(())
    }

    /// Stores the remote listing and moves to Reconciling
    pub fn set_remote(&mut self, remote: Vec<RemoteFileEntry>) -> Result<(), DomainError> {
        self.transition(&SessionStatus::Listing, SessionStatus::Reconciling)?;
        self.remote = remote;
        Ok(())
    }

    /// Marks the session finished according to the report
    pub fn complete(&mut self, report: &SyncReport) -> Result<(), DomainError> {
        let next = if report.cancelled {
            SessionStatus::Cancelled
        } else {
            SessionStatus::Completed
        };
        self.transition(&SessionStatus::Reconciling, next)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Marks the session as failed; allowed from any non-terminal state
    pub fn fail(&mut self, reason: impl Into<String>) {
        if !self.status.is_finished() {
            self.status = SessionStatus::Failed(reason.into());
            self.completed_at = Some(Utc::now());
        }
    }
}
