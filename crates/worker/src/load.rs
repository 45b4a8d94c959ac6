//! Loads transformed data into the warehouse.

use clickhouse_client::Warehouse;
use pipeline_core::Result;
use serde::Serialize;
use tracing::info;

use crate::transform::TransformedData;

/// Rows written per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub products: usize,
    pub sales: usize,
    pub report_rows: usize,
}

impl LoadStats {
    pub fn total(&self) -> usize {
        self.products + self.sales + self.report_rows
    }
}

/// Replaces the processed products, processed sales, and report tables.
///
/// Each table is truncated before the insert, so a retried or repeated
/// run leaves exactly one copy of the data.
pub async fn load(warehouse: &dyn Warehouse, data: &TransformedData) -> Result<LoadStats> {
    let products = warehouse.replace_products(&data.products).await?;
    let sales = warehouse.replace_sales(&data.sales).await?;
    let report_rows = warehouse.replace_report(&data.report).await?;

    let stats = LoadStats {
        products,
        sales,
        report_rows,
    };

    info!(
        products = stats.products,
        sales = stats.sales,
        report_rows = stats.report_rows,
        "Loaded data into warehouse"
    );

    Ok(stats)
}
