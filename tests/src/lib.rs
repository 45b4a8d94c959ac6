//! Shared harness for the pipeline integration tests.

pub mod fixtures;
pub mod mocks;
pub mod setup;
