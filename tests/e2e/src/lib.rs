//! End-to-end test support for Lingua
//!
//! - `harness`: isolated databases with a ready learner profile
//! - `mocks`: vocabulary fixtures and review-history builders

pub mod harness;
pub mod mocks;

pub use harness::TestDatabaseManager;
pub use mocks::TestDataFactory;
