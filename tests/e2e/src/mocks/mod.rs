//! Test data

mod fixtures;

pub use fixtures::{ReviewScenario, TestDataFactory};
