//! projsync Core - Domain logic and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `LocalInventory`, `RemoteFileEntry`, `SyncSession`, `SyncReport`
//! - **Content fingerprints** - normalized and raw digests used for change detection
//! - **Port definitions** - `IRemoteStore`, the boundary to the remote project store
//! - **Configuration** - the YAML config file and its validation
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure data types with no I/O.
//! Ports define trait interfaces that adapter crates implement; the sync
//! engine in `projsync-sync` drives them.

pub mod config;
pub mod domain;
pub mod fingerprint;
pub mod ports;
