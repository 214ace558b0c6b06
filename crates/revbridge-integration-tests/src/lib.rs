//! Integration test crate for the Revbridge settlement bridge.
//!
//! This crate has no library code. It only contains integration tests
//! that exercise end-to-end settlement flows across the workspace crates:
//! gateway, ledger, allocation, partition store and event log together.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p revbridge-integration-tests
//! ```
