//! Tasks and orchestration for the daily sales pipeline.
//!
//! - Extract (products and sales CSVs)
//! - Transform (cleaning, derived columns, join)
//! - Load (four warehouse tables)
//! - Report (JSON sales summary)
//! - Performance (low-performance alerts)
//! - Scheduler (daily trigger with fixed-delay retries)

pub mod config;
pub mod extract;
pub mod load;
pub mod performance;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod scheduler;
pub mod transform;

pub use config::PipelineConfig;
pub use performance::PerformanceAnalyzer;
pub use pipeline::*;
pub use retry::{run_with_retry, RetryPolicy};
pub use scheduler::PipelineScheduler;
