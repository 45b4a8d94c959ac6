//! Query functions for reading pipeline tables back.

use crate::client::ClickHouseClient;
use crate::insert::{AlertRow, ReportRecord};
use clickhouse::Row;
use pipeline_core::error::DbErrorCode;
use pipeline_core::{LowPerformanceAlert, ProductSalesTotal, ReportRow, Result};
use serde::Deserialize;

/// Units sold per (product, category), as returned by the aggregation query.
#[derive(Debug, Clone, Row, Deserialize)]
struct SalesTotalRow {
    product_name: String,
    category: String,
    total_units_sold: i64,
}

fn query_error(e: clickhouse::error::Error) -> pipeline_core::Error {
    pipeline_core::Error::database(DbErrorCode::QueryFailed, format!("Query error: {}", e))
}

/// Sum of units sold per (product name, category) over the report table.
pub async fn product_sales_totals(client: &ClickHouseClient) -> Result<Vec<ProductSalesTotal>> {
    let sql = r#"
        SELECT
            product_name,
            category,
            toInt64(sum(quantity_sold)) AS total_units_sold
        FROM sales_report
        GROUP BY product_name, category
        ORDER BY product_name, category
    "#;

    let rows: Vec<SalesTotalRow> = client
        .inner()
        .query(sql)
        .fetch_all()
        .await
        .map_err(query_error)?;

    Ok(rows
        .into_iter()
        .map(|r| ProductSalesTotal {
            product_name: r.product_name,
            category: r.category,
            total_units_sold: r.total_units_sold,
        })
        .collect())
}

/// Fetch every row of the sales report.
pub async fn report_rows(client: &ClickHouseClient) -> Result<Vec<ReportRow>> {
    let rows: Vec<ReportRecord> = client
        .inner()
        .query(
            "SELECT sale_id, product_name, category, quantity_sold, total_revenue, \
             profit_margin, channel, sale_month FROM sales_report ORDER BY sale_id",
        )
        .fetch_all()
        .await
        .map_err(query_error)?;
    Ok(rows.into_iter().map(ReportRow::from).collect())
}

/// Fetch the current low-performance alerts.
pub async fn low_performers(client: &ClickHouseClient) -> Result<Vec<LowPerformanceAlert>> {
    let rows: Vec<AlertRow> = client
        .inner()
        .query(
            "SELECT product_name, category, total_units_sold, alert_status, \
             toUInt32(analyzed_at) AS analyzed_at FROM low_performance_products \
             ORDER BY product_name, category",
        )
        .fetch_all()
        .await
        .map_err(query_error)?;
    Ok(rows.into_iter().map(LowPerformanceAlert::from).collect())
}

/// Count rows in a pipeline table.
pub async fn count_rows(client: &ClickHouseClient, table: &str) -> Result<u64> {
    let count: u64 = client
        .inner()
        .query(&format!("SELECT count() FROM {}", table))
        .fetch_one()
        .await
        .map_err(query_error)?;
    Ok(count)
}
