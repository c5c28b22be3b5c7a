//! Integration tests for projsync-remote
//!
//! Uses wiremock to simulate the project store API and verifies
//! end-to-end behavior of the HttpRemoteStore.

mod common;

mod test_docs;
mod test_errors;
mod test_projects;
