//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! mostly validation failures of the newtypes in [`super::newtypes`].

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid root-relative path
    #[error("Invalid relative path: {0}")]
    InvalidPath(String),

    /// Invalid fingerprint format (expected lowercase hex digest)
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Organization or project identifier is missing or malformed
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Invalid session state transition
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}
