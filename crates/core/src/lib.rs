//! Core records, derivations, and error types for the sales pipeline.

pub mod error;
pub mod money;
pub mod performance;
pub mod product;
pub mod report;
pub mod sale;
pub mod schedule;

pub use error::{Error, Result};
pub use money::Cents;
pub use performance::*;
pub use product::*;
pub use report::*;
pub use sale::*;
pub use schedule::*;
