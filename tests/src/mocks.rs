//! Mock implementations for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use clickhouse_client::Warehouse;
use parking_lot::Mutex;
use pipeline_core::error::DbErrorCode;
use pipeline_core::{
    aggregate_units, Error, LowPerformanceAlert, ProcessedSale, Product, ProductSalesTotal,
    ReportRow, Result,
};

/// Warehouse operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    CreateTables,
    ReplaceProducts,
    ReplaceSales,
    ReplaceReport,
    ReportRows,
    ProductSalesTotals,
    ReplaceLowPerformers,
    LowPerformers,
}

impl MockOp {
    fn code(&self) -> DbErrorCode {
        match self {
            MockOp::CreateTables => DbErrorCode::SchemaFailed,
            MockOp::ReportRows | MockOp::ProductSalesTotals | MockOp::LowPerformers => {
                DbErrorCode::QueryFailed
            }
            _ => DbErrorCode::StoreFailed,
        }
    }
}

#[derive(Default)]
struct MockState {
    tables_created: bool,
    products: Vec<Product>,
    sales: Vec<ProcessedSale>,
    report: Vec<ReportRow>,
    alerts: Vec<LowPerformanceAlert>,
    /// Remaining forced failures per operation.
    failures: HashMap<MockOp, u32>,
    calls: HashMap<MockOp, u32>,
    unhealthy: bool,
}

/// In-memory warehouse that keeps the four tables in vectors.
///
/// Implements the same `Warehouse` trait as `ClickHouseClient`, so the
/// pipeline runs its production code paths against it. Tables must be
/// created before they are written, as with the real server.
#[derive(Clone, Default)]
pub struct MockWarehouse {
    state: Arc<Mutex<MockState>>,
}

impl MockWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` calls of `op` fail.
    pub fn fail_times(&self, op: MockOp, times: u32) {
        self.state.lock().failures.insert(op, times);
    }

    /// Make every call of `op` fail.
    pub fn fail_always(&self, op: MockOp) {
        self.fail_times(op, u32::MAX);
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.state.lock().unhealthy = unhealthy;
    }

    /// Number of times `op` was invoked.
    pub fn calls(&self, op: MockOp) -> u32 {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn tables_created(&self) -> bool {
        self.state.lock().tables_created
    }

    pub fn products(&self) -> Vec<Product> {
        self.state.lock().products.clone()
    }

    pub fn sales(&self) -> Vec<ProcessedSale> {
        self.state.lock().sales.clone()
    }

    pub fn report(&self) -> Vec<ReportRow> {
        self.state.lock().report.clone()
    }

    pub fn alerts(&self) -> Vec<LowPerformanceAlert> {
        self.state.lock().alerts.clone()
    }

    /// Put rows straight into the report table, creating tables if needed.
    pub fn seed_report(&self, rows: Vec<ReportRow>) {
        let mut state = self.state.lock();
        state.tables_created = true;
        state.report = rows;
    }

    /// Put rows straight into the alert table, creating tables if needed.
    pub fn seed_alerts(&self, alerts: Vec<LowPerformanceAlert>) {
        let mut state = self.state.lock();
        state.tables_created = true;
        state.alerts = alerts;
    }

    fn enter(&self, op: MockOp, needs_tables: bool) -> Result<parking_lot::MutexGuard<'_, MockState>> {
        let mut state = self.state.lock();
        *state.calls.entry(op).or_default() += 1;

        if let Some(remaining) = state.failures.get_mut(&op) {
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                return Err(Error::database(op.code(), format!("mock {:?} failure", op)));
            }
        }
        if needs_tables && !state.tables_created {
            return Err(Error::database(op.code(), "table does not exist"));
        }
        Ok(state)
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn create_tables(&self) -> Result<()> {
        let mut state = self.enter(MockOp::CreateTables, false)?;
        state.tables_created = true;
        Ok(())
    }

    async fn replace_products(&self, products: &[Product]) -> Result<usize> {
        let mut state = self.enter(MockOp::ReplaceProducts, true)?;
        state.products = products.to_vec();
        Ok(products.len())
    }

    async fn replace_sales(&self, sales: &[ProcessedSale]) -> Result<usize> {
        let mut state = self.enter(MockOp::ReplaceSales, true)?;
        state.sales = sales.to_vec();
        Ok(sales.len())
    }

    async fn replace_report(&self, rows: &[ReportRow]) -> Result<usize> {
        let mut state = self.enter(MockOp::ReplaceReport, true)?;
        state.report = rows.to_vec();
        Ok(rows.len())
    }

    async fn report_rows(&self) -> Result<Vec<ReportRow>> {
        let state = self.enter(MockOp::ReportRows, true)?;
        Ok(state.report.clone())
    }

    async fn product_sales_totals(&self) -> Result<Vec<ProductSalesTotal>> {
        let state = self.enter(MockOp::ProductSalesTotals, true)?;
        Ok(aggregate_units(&state.report))
    }

    async fn replace_low_performers(&self, alerts: &[LowPerformanceAlert]) -> Result<usize> {
        let mut state = self.enter(MockOp::ReplaceLowPerformers, true)?;
        state.alerts = alerts.to_vec();
        Ok(alerts.len())
    }

    async fn low_performers(&self) -> Result<Vec<LowPerformanceAlert>> {
        let state = self.enter(MockOp::LowPerformers, true)?;
        Ok(state.alerts.clone())
    }

    async fn is_healthy(&self) -> bool {
        !self.state.lock().unhealthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::Cents;

    fn row(name: &str, qty: i64) -> ReportRow {
        ReportRow {
            sale_id: format!("V-{}", name),
            product_name: name.into(),
            category: "Moveis".into(),
            quantity: qty,
            revenue: Cents(1000 * qty),
            margin: Cents(100 * qty),
            channel: "Online".into(),
            month: "2024-01".into(),
        }
    }

    #[tokio::test]
    async fn test_mock_requires_tables() {
        let mock = MockWarehouse::new();
        assert!(mock.replace_report(&[row("Mesa", 1)]).await.is_err());

        mock.create_tables().await.unwrap();
        assert_eq!(mock.replace_report(&[row("Mesa", 1)]).await.unwrap(), 1);
        assert_eq!(mock.report().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_failure_budget() {
        let mock = MockWarehouse::new();
        mock.fail_times(MockOp::CreateTables, 1);

        let err = mock.create_tables().await.unwrap_err();
        assert_eq!(err.error_code(), Some("DB_003"));
        assert!(mock.create_tables().await.is_ok());
        assert_eq!(mock.calls(MockOp::CreateTables), 2);
    }

    #[tokio::test]
    async fn test_mock_health_toggle() {
        let mock = MockWarehouse::new();
        assert!(mock.is_healthy().await);
        mock.set_unhealthy(true);
        assert!(!mock.is_healthy().await);
    }
}
