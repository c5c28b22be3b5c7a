//! projsync Sync - Local inventory and reconciliation engine
//!
//! Provides:
//! - Local inventory building with ignore rules and text-only filtering
//! - A set-based reconciliation engine driving an [`IRemoteStore`]
//! - An explicit retry policy for transient Remote Store failures
//! - Submodule discovery and independent per-root sessions
//!
//! ## Modules
//!
//! - [`ignore`] - Exclusion rules from `.gitignore` and `.projsyncignore`
//! - [`category`] - Named file categories restricting an inventory
//! - [`inventory`] - Local inventory builder
//! - [`retry`] - Retry policy with exponential backoff
//! - [`engine`] - Reconciliation plan and its execution
//! - [`submodule`] - Discovery of nested project roots
//! - [`session`] - Session runner composing the above per root
//!
//! [`IRemoteStore`]: projsync_core::ports::IRemoteStore

pub mod category;
pub mod engine;
pub mod ignore;
pub mod inventory;
pub mod retry;
pub mod session;
pub mod submodule;

use std::path::PathBuf;

use thiserror::Error;

use projsync_core::domain::errors::DomainError;
use projsync_core::domain::records::Scope;
use projsync_core::ports::RemoteError;

/// Errors that end a whole session
///
/// Per-file problems never surface here; they are recorded in the
/// session's [`SyncReport`](projsync_core::domain::SyncReport).
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid or missing configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// The sync root does not exist
    #[error("Sync root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// The sync root exists but is not a directory
    #[error("Sync root is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    /// An I/O error occurred on the sync root itself
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote listing could not be obtained
    #[error("Failed to list {scope}: {source}")]
    Listing {
        scope: Scope,
        #[source]
        source: RemoteError,
    },

    /// A domain-level error propagated from projsync-core
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// A blocking filesystem task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(String),
}

impl SyncError {
    /// Returns true for errors caused by configuration rather than runtime state
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            SyncError::Config(_) | SyncError::RootNotFound(_) | SyncError::RootNotDirectory(_)
        )
    }
}
