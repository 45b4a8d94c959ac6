//! ClickHouse warehouse for the sales pipeline.

pub mod client;
pub mod config;
pub mod health;
pub mod insert;
pub mod query;
pub mod schema;
pub mod warehouse;

pub use client::*;
pub use config::*;
pub use warehouse::Warehouse;
