//! Batch insert helpers for ClickHouse.
//!
//! Row structs list only the columns we write; the processing timestamp
//! columns fall back to their `now()` default.

use crate::client::ClickHouseClient;
use crate::schema::{LOW_PERFORMANCE_TABLE, PRODUCTS_TABLE, REPORT_TABLE, SALES_TABLE};
use chrono::{DateTime, NaiveDate, Utc};
use clickhouse::Row;
use pipeline_core::error::DbErrorCode;
use pipeline_core::{
    Cents, LowPerformanceAlert, ProcessedSale, Product, ReportRow, Result,
};
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::debug;

/// Flattened product row for `processed_products`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct ProductRow {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    /// Decimal(10, 2) as cents
    pub cost_price: i64,
    pub supplier: String,
    pub status: String,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.product_id.clone(),
            product_name: product.name.clone(),
            category: product.category.clone(),
            cost_price: product.cost_price.get(),
            supplier: product.supplier.clone(),
            status: product.status.clone(),
        }
    }
}

/// Flattened sale row for `processed_sales`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct SaleRow {
    pub sale_id: String,
    pub product_id: String,
    pub quantity_sold: i64,
    pub unit_price: i64,
    /// Days since 1970-01-01 (ClickHouse `Date`)
    pub sale_date: u16,
    pub channel: String,
    pub total_revenue: i64,
    pub sale_month: String,
}

impl TryFrom<&ProcessedSale> for SaleRow {
    type Error = pipeline_core::Error;

    fn try_from(sale: &ProcessedSale) -> Result<Self> {
        Ok(Self {
            sale_id: sale.sale.sale_id.clone(),
            product_id: sale.sale.product_id.clone(),
            quantity_sold: sale.sale.quantity,
            unit_price: sale.sale.unit_price.get(),
            sale_date: date_to_days(sale.sale.sale_date)?,
            channel: sale.sale.channel.clone(),
            total_revenue: sale.revenue.get(),
            sale_month: sale.month.clone(),
        })
    }
}

/// Flattened report row for `sales_report`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct ReportRecord {
    pub sale_id: String,
    pub product_name: String,
    pub category: String,
    pub quantity_sold: i64,
    pub total_revenue: i64,
    pub profit_margin: i64,
    pub channel: String,
    pub sale_month: String,
}

impl From<&ReportRow> for ReportRecord {
    fn from(row: &ReportRow) -> Self {
        Self {
            sale_id: row.sale_id.clone(),
            product_name: row.product_name.clone(),
            category: row.category.clone(),
            quantity_sold: row.quantity,
            total_revenue: row.revenue.get(),
            profit_margin: row.margin.get(),
            channel: row.channel.clone(),
            sale_month: row.month.clone(),
        }
    }
}

impl From<ReportRecord> for ReportRow {
    fn from(record: ReportRecord) -> Self {
        Self {
            sale_id: record.sale_id,
            product_name: record.product_name,
            category: record.category,
            quantity: record.quantity_sold,
            revenue: Cents::new(record.total_revenue),
            margin: Cents::new(record.profit_margin),
            channel: record.channel,
            month: record.sale_month,
        }
    }
}

/// Flattened alert row for `low_performance_products`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct AlertRow {
    pub product_name: String,
    pub category: String,
    pub total_units_sold: i64,
    pub alert_status: String,
    /// Seconds since epoch (ClickHouse `DateTime`)
    pub analyzed_at: u32,
}

impl From<&LowPerformanceAlert> for AlertRow {
    fn from(alert: &LowPerformanceAlert) -> Self {
        Self {
            product_name: alert.product_name.clone(),
            category: alert.category.clone(),
            total_units_sold: alert.total_units_sold,
            alert_status: alert.status.clone(),
            analyzed_at: u32::try_from(alert.analyzed_at.timestamp()).unwrap_or(0),
        }
    }
}

impl From<AlertRow> for LowPerformanceAlert {
    fn from(row: AlertRow) -> Self {
        Self {
            product_name: row.product_name,
            category: row.category,
            total_units_sold: row.total_units_sold,
            status: row.alert_status,
            analyzed_at: DateTime::<Utc>::from_timestamp(row.analyzed_at as i64, 0)
                .unwrap_or_default(),
        }
    }
}

/// Converts a date to ClickHouse `Date` (days since epoch).
pub fn date_to_days(date: NaiveDate) -> Result<u16> {
    let days = (date - NaiveDate::default()).num_days();
    u16::try_from(days).map_err(|_| {
        pipeline_core::Error::validation(format!("date {} outside ClickHouse Date range", date))
    })
}

/// Writes rows to a table in a single insert.
async fn insert_rows<T>(client: &ClickHouseClient, table: &str, rows: &[T]) -> Result<usize>
where
    T: Row + Serialize,
{
    if rows.is_empty() {
        return Ok(0);
    }

    let start = std::time::Instant::now();

    let mut insert = client.inner().insert::<T>(table).map_err(|e| {
        metrics().warehouse_insert_errors.inc();
        pipeline_core::Error::database(DbErrorCode::StoreFailed, format!("Insert error: {}", e))
    })?;

    for row in rows {
        insert.write(row).await.map_err(|e| {
            metrics().warehouse_insert_errors.inc();
            pipeline_core::Error::database(DbErrorCode::StoreFailed, format!("Write error: {}", e))
        })?;
    }

    insert.end().await.map_err(|e| {
        metrics().warehouse_insert_errors.inc();
        pipeline_core::Error::database(DbErrorCode::StoreFailed, format!("End error: {}", e))
    })?;

    let elapsed = start.elapsed();
    metrics().warehouse_inserts.inc();
    metrics().rows_loaded.inc_by(rows.len() as u64);
    metrics()
        .warehouse_latency_ms
        .observe(elapsed.as_millis() as u64);

    debug!(
        table = table,
        rows = rows.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Inserted rows"
    );

    Ok(rows.len())
}

/// Empties a table.
pub async fn truncate_table(client: &ClickHouseClient, table: &str) -> Result<()> {
    client
        .inner()
        .query(&format!("TRUNCATE TABLE IF EXISTS {}", table))
        .execute()
        .await
        .map_err(|e| {
            pipeline_core::Error::database(
                DbErrorCode::StoreFailed,
                format!("Truncate {} error: {}", table, e),
            )
        })
}

/// Truncates a table and writes `rows` into it.
async fn replace_rows<T>(client: &ClickHouseClient, table: &str, rows: &[T]) -> Result<usize>
where
    T: Row + Serialize,
{
    truncate_table(client, table).await?;
    insert_rows(client, table, rows).await
}

/// Replace the contents of `processed_products`.
pub async fn replace_products(client: &ClickHouseClient, products: &[Product]) -> Result<usize> {
    let rows: Vec<ProductRow> = products.iter().map(ProductRow::from).collect();
    replace_rows(client, PRODUCTS_TABLE, &rows).await
}

/// Replace the contents of `processed_sales`.
pub async fn replace_sales(client: &ClickHouseClient, sales: &[ProcessedSale]) -> Result<usize> {
    let rows = sales
        .iter()
        .map(SaleRow::try_from)
        .collect::<Result<Vec<_>>>()?;
    replace_rows(client, SALES_TABLE, &rows).await
}

/// Replace the contents of `sales_report`.
pub async fn replace_report(client: &ClickHouseClient, report: &[ReportRow]) -> Result<usize> {
    let rows: Vec<ReportRecord> = report.iter().map(ReportRecord::from).collect();
    replace_rows(client, REPORT_TABLE, &rows).await
}

/// Replace the contents of `low_performance_products`.
pub async fn replace_low_performers(
    client: &ClickHouseClient,
    alerts: &[LowPerformanceAlert],
) -> Result<usize> {
    let rows: Vec<AlertRow> = alerts.iter().map(AlertRow::from).collect();
    replace_rows(client, LOW_PERFORMANCE_TABLE, &rows).await
}
