//! Test utilities
//!
//! Manual mock implementations and test fixtures for unit testing.
//!
//! Why manual mocks instead of mockall?
//! - The vote store's transaction type is an associated type with a consuming
//!   `commit`, which is awkward to express with generated mocks
//! - One in-memory forum backs every port, so tests can check the ledger and
//!   the denormalized counts against the same state
//! - Faults are injected explicitly, without expectation setup

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
