//! Low-performance product analysis.
//!
//! Runs one aggregation over the report table, keeps the (product,
//! category) pairs below the threshold, and replaces the alert table with
//! them. An empty result clears the table.

use std::sync::Arc;

use chrono::Utc;
use clickhouse_client::Warehouse;
use pipeline_core::{
    detect_low_performers, format_alert_table, AnalysisOutcome, Result, LOW_PERFORMANCE_THRESHOLD,
};
use telemetry::metrics;
use tracing::{info, warn};

/// Flags products that sold fewer than `threshold` units.
pub struct PerformanceAnalyzer {
    warehouse: Arc<dyn Warehouse>,
    threshold: i64,
}

impl PerformanceAnalyzer {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self {
            warehouse,
            threshold: LOW_PERFORMANCE_THRESHOLD,
        }
    }

    /// Runs the analysis and replaces the alert table.
    pub async fn analyze(&self) -> Result<AnalysisOutcome> {
        info!(threshold = self.threshold, "Starting sales performance analysis");

        let totals = self.warehouse.product_sales_totals().await?;
        let alerts = detect_low_performers(&totals, self.threshold, Utc::now());

        self.warehouse.replace_low_performers(&alerts).await?;
        metrics().low_performance_alerts.set(alerts.len() as u64);

        let outcome = AnalysisOutcome::from_alerts(&alerts);
        match outcome {
            AnalysisOutcome::Alerted { count } => {
                warn!(count = count, "LOW PERFORMANCE: {} products identified", count);
                warn!("\n{}", format_alert_table(&alerts));
                info!(count = count, "Loaded low-performance products");
            }
            AnalysisOutcome::NoAlert => {
                info!(
                    threshold = self.threshold,
                    products = totals.len(),
                    "No low-performance products detected"
                );
            }
        }

        Ok(outcome)
    }
}
