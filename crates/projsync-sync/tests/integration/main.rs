//! Integration tests for the sync engine
//!
//! Sessions run against an in-memory Remote Store over real temporary
//! directories.

mod common;
mod test_tree;
