//! Sales report generation.
//!
//! Summarizes the loaded `sales_report` table and writes it as JSON to
//! `report_dir/sales_report_{YYYYMMDD}.json`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clickhouse_client::Warehouse;
use pipeline_core::{Error, Result, SalesReport};
use tracing::info;

/// Where the report was written and what it contains.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub path: PathBuf,
    pub report: SalesReport,
}

/// File name for a report generated at `at`.
pub fn report_file_name(at: DateTime<Utc>) -> String {
    format!("sales_report_{}.json", at.format("%Y%m%d"))
}

/// Builds the summary from the warehouse and writes it to `report_dir`.
pub async fn generate_report(
    warehouse: &dyn Warehouse,
    report_dir: &Path,
    top_products: usize,
    generated_at: DateTime<Utc>,
) -> Result<GeneratedReport> {
    let rows = warehouse.report_rows().await?;
    let report = SalesReport::from_rows(&rows, generated_at, top_products);

    tokio::fs::create_dir_all(report_dir).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("report dir {}: {}", report_dir.display(), e),
        ))
    })?;

    let path = report_dir.join(report_file_name(generated_at));
    let json = serde_json::to_vec_pretty(&report)?;
    tokio::fs::write(&path, json).await?;

    info!(
        path = %path.display(),
        sales = report.totals.sales,
        units = report.totals.units,
        revenue = %report.totals.revenue,
        margin = %report.totals.margin,
        margin_percent = report.totals.margin_percent,
        "Sales report generated"
    );

    Ok(GeneratedReport { path, report })
}
