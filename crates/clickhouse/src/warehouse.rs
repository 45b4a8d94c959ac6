//! Storage seam used by the pipeline tasks.

use async_trait::async_trait;
use pipeline_core::{
    LowPerformanceAlert, ProcessedSale, Product, ProductSalesTotal, ReportRow, Result,
};

use crate::client::ClickHouseClient;
use crate::{health, insert, query, schema};

/// Everything the pipeline needs from the warehouse.
///
/// `ClickHouseClient` is the production implementation; tests provide an
/// in-memory one.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Create the database and the four tables if missing.
    async fn create_tables(&self) -> Result<()>;

    /// Replace the processed products table.
    async fn replace_products(&self, products: &[Product]) -> Result<usize>;

    /// Replace the processed sales table.
    async fn replace_sales(&self, sales: &[ProcessedSale]) -> Result<usize>;

    /// Replace the sales report table.
    async fn replace_report(&self, rows: &[ReportRow]) -> Result<usize>;

    /// All rows of the sales report table.
    async fn report_rows(&self) -> Result<Vec<ReportRow>>;

    /// Units sold per (product name, category) over the report table.
    async fn product_sales_totals(&self) -> Result<Vec<ProductSalesTotal>>;

    /// Replace the low-performance alert table.
    async fn replace_low_performers(&self, alerts: &[LowPerformanceAlert]) -> Result<usize>;

    /// Current contents of the alert table.
    async fn low_performers(&self) -> Result<Vec<LowPerformanceAlert>>;

    /// Whether the warehouse answers queries.
    async fn is_healthy(&self) -> bool;
}

#[async_trait]
impl Warehouse for ClickHouseClient {
    async fn create_tables(&self) -> Result<()> {
        schema::init_schema(self).await
    }

    async fn replace_products(&self, products: &[Product]) -> Result<usize> {
        insert::replace_products(self, products).await
    }

    async fn replace_sales(&self, sales: &[ProcessedSale]) -> Result<usize> {
        insert::replace_sales(self, sales).await
    }

    async fn replace_report(&self, rows: &[ReportRow]) -> Result<usize> {
        insert::replace_report(self, rows).await
    }

    async fn report_rows(&self) -> Result<Vec<ReportRow>> {
        query::report_rows(self).await
    }

    async fn product_sales_totals(&self) -> Result<Vec<ProductSalesTotal>> {
        query::product_sales_totals(self).await
    }

    async fn replace_low_performers(&self, alerts: &[LowPerformanceAlert]) -> Result<usize> {
        insert::replace_low_performers(self, alerts).await
    }

    async fn low_performers(&self) -> Result<Vec<LowPerformanceAlert>> {
        query::low_performers(self).await
    }

    async fn is_healthy(&self) -> bool {
        health::check_connection(self).await
    }
}
