//! projsync Remote - HTTP adapter for the project store
//!
//! Provides:
//! - [`client`] - session-key authenticated HTTP client with status mapping
//! - [`store`] - [`IRemoteStore`](projsync_core::ports::IRemoteStore)
//!   implementation over the documents and projects endpoints

pub mod client;
pub mod store;

pub use client::ApiClient;
pub use store::HttpRemoteStore;
