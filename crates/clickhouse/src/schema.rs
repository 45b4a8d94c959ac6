//! ClickHouse table schemas.
//!
//! Every statement is `IF NOT EXISTS`, so running the initializer on each
//! pipeline run is safe. Money columns are `Decimal(10, 2)`; every table
//! carries a processing timestamp filled by `now()`.

use crate::client::ClickHouseClient;
use pipeline_core::error::DbErrorCode;
use pipeline_core::Result;
use tracing::debug;

pub const PRODUCTS_TABLE: &str = "processed_products";
pub const SALES_TABLE: &str = "processed_sales";
pub const REPORT_TABLE: &str = "sales_report";
pub const LOW_PERFORMANCE_TABLE: &str = "low_performance_products";

/// SQL for creating the processed products table.
pub const CREATE_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS processed_products (
    product_id String,
    product_name String,
    category LowCardinality(String),
    cost_price Decimal(10, 2),
    supplier String,
    status LowCardinality(String),
    processed_at DateTime DEFAULT now()
)
ENGINE = MergeTree()
ORDER BY product_id
"#;

/// SQL for creating the processed sales table.
///
/// `total_revenue` and `sale_month` are derived during transformation.
pub const CREATE_SALES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS processed_sales (
    sale_id String,
    product_id String,
    quantity_sold Int64,
    unit_price Decimal(10, 2),
    sale_date Date,
    channel LowCardinality(String),
    total_revenue Decimal(10, 2),
    sale_month String,
    processed_at DateTime DEFAULT now()
)
ENGINE = MergeTree()
ORDER BY (sale_date, sale_id)
"#;

/// SQL for creating the sales report table (one row per joined sale).
pub const CREATE_REPORT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sales_report (
    sale_id String,
    product_name String,
    category LowCardinality(String),
    quantity_sold Int64,
    total_revenue Decimal(10, 2),
    profit_margin Decimal(10, 2),
    channel LowCardinality(String),
    sale_month String,
    processed_at DateTime DEFAULT now()
)
ENGINE = MergeTree()
ORDER BY (product_name, category, sale_id)
"#;

/// SQL for creating the low-performance alert table.
pub const CREATE_LOW_PERFORMANCE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS low_performance_products (
    product_name String,
    category LowCardinality(String),
    total_units_sold Int64,
    alert_status String,
    analyzed_at DateTime DEFAULT now()
)
ENGINE = MergeTree()
ORDER BY (product_name, category)
"#;

/// Names of the pipeline tables, in creation order.
pub fn table_names() -> [&'static str; 4] {
    [PRODUCTS_TABLE, SALES_TABLE, REPORT_TABLE, LOW_PERFORMANCE_TABLE]
}

/// All table creation statements, in the same order as `table_names`.
pub fn create_statements() -> [&'static str; 4] {
    [
        CREATE_PRODUCTS_TABLE,
        CREATE_SALES_TABLE,
        CREATE_REPORT_TABLE,
        CREATE_LOW_PERFORMANCE_TABLE,
    ]
}

/// Initialize the database schema.
///
/// Creates the database and all four tables if they don't exist.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    let database = &client.config().database;
    client
        .server()
        .query(&format!("CREATE DATABASE IF NOT EXISTS `{}`", database))
        .execute()
        .await
        .map_err(|e| {
            pipeline_core::Error::database(
                DbErrorCode::SchemaFailed,
                format!("Create database {}: {}", database, e),
            )
        })?;

    for sql in create_statements() {
        client.inner().query(sql).execute().await.map_err(|e| {
            pipeline_core::Error::database(
                DbErrorCode::SchemaFailed,
                format!("Schema init error: {}", e),
            )
        })?;
    }

    debug!(database = %database, tables = table_names().len(), "ClickHouse schema initialized");
    Ok(())
}
