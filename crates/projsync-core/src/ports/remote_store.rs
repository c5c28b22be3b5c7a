//! Remote Store port (driven/secondary port)
//!
//! This module defines the interface for the remote project store that a
//! local tree is synchronized into. The HTTP implementation lives in
//! `projsync-remote`; tests use in-memory doubles.
//!
//! ## Design Notes
//!
//! - Unlike most adapter errors, Remote Store failures are classified at the
//!   port boundary: the reconciliation engine retries [`RemoteError::is_transient`]
//!   failures and records everything else against the affected file.
//! - Uses `#[async_trait]` for async trait methods.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::newtypes::{OrganizationId, RelativePath, RemoteId};
use crate::domain::records::{RemoteFileEntry, RemoteProject, Scope};

// ============================================================================
// RemoteError
// ============================================================================

/// Failure of a single Remote Store call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Quota exhausted; carries the reset hint when the store provides one
    #[error("Rate limited{}", .retry_after.map(|d| format!(" (retry after {}s)", d.as_secs())).unwrap_or_default())]
    RateLimited {
        retry_after: Option<Duration>,
        resets_at: Option<DateTime<Utc>>,
    },

    /// Forbidden, usually a momentarily stale credential
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The store is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Connection, DNS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The store answered with a body that could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Remote error: {0}")]
    Permanent(String),
}

impl RemoteError {
    /// Returns true for failures worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::RateLimited { .. }
                | RemoteError::Forbidden(_)
                | RemoteError::Unavailable(_)
                | RemoteError::Network(_)
        )
    }

    /// How long the store asked the caller to wait, if it said
    ///
    /// Falls back to `resets_at` relative to now when only an absolute
    /// reset time is known.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RemoteError::RateLimited {
                retry_after,
                resets_at,
            } => retry_after.or_else(|| {
                resets_at.map(|at| (at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
            }),
            _ => None,
        }
    }
}

// ============================================================================
// IRemoteStore trait
// ============================================================================

/// Port trait for Remote Store operations
///
/// Implementations perform a single attempt per call; retrying is the
/// caller's responsibility.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Lists every file in the scope
    async fn list_files(&self, scope: &Scope) -> Result<Vec<RemoteFileEntry>, RemoteError>;

    /// Uploads a file, always creating a new entry with a new remote id
    async fn upload_file(
        &self,
        scope: &Scope,
        path: &RelativePath,
        content: &str,
    ) -> Result<RemoteFileEntry, RemoteError>;

    /// Deletes an entry by its remote id
    async fn delete_file(&self, scope: &Scope, remote_id: &RemoteId) -> Result<(), RemoteError>;

    /// Lists the projects of an organization, archived ones included
    async fn list_projects(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<RemoteProject>, RemoteError>;

    /// Creates a project and returns it
    async fn create_project(
        &self,
        organization: &OrganizationId,
        name: &str,
        description: &str,
    ) -> Result<RemoteProject, RemoteError>;
}
