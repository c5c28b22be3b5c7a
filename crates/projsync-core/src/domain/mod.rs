//! Domain entities and business logic
//!
//! This module contains the core domain types for projsync:
//! - Newtypes for type-safe identifiers and validated domain types
//! - Local and remote file collections
//! - Session lifecycle and per-session reports
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod records;
pub mod report;
pub mod session;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::*;
pub use records::{FileRecord, LocalInventory, RemoteFileEntry, RemoteProject, Scope};
pub use report::{FileFailure, FileOperation, SyncReport};
pub use session::{SessionStatus, SyncSession};
