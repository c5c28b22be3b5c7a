//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are interfaces that the sync engine depends on, but whose
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Remote project store: list, upload, delete, project directory

pub mod remote_store;

pub use remote_store::{IRemoteStore, RemoteError};
