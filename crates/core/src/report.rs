//! Sales report rows and the summary built from them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::money::Cents;
use crate::product::Product;
use crate::sale::ProcessedSale;

/// Default number of products listed in the top-revenue section.
pub const DEFAULT_TOP_PRODUCTS: usize = 5;

/// One sale joined with its product attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub sale_id: String,
    pub product_name: String,
    pub category: String,
    pub quantity: i64,
    pub revenue: Cents,
    /// Revenue minus quantity times the product cost price.
    pub margin: Cents,
    pub channel: String,
    pub month: String,
}

impl ReportRow {
    /// Fails when the cost or margin does not fit the report columns.
    pub fn join(sale: &ProcessedSale, product: &Product) -> Result<Self> {
        let cost = product.cost_price.checked_mul(sale.sale.quantity)?;
        Ok(Self {
            sale_id: sale.sale.sale_id.clone(),
            product_name: product.name.clone(),
            category: product.category.clone(),
            quantity: sale.sale.quantity,
            revenue: sale.revenue,
            margin: sale.revenue.checked_sub(cost)?,
            channel: sale.sale.channel.clone(),
            month: sale.month.clone(),
        })
    }
}

/// Aggregated figures for one slice of the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalesTotals {
    pub sales: u64,
    pub units: i64,
    pub revenue: Cents,
    pub margin: Cents,
    pub margin_percent: f64,
}

impl SalesTotals {
    fn add(&mut self, row: &ReportRow) {
        self.sales += 1;
        self.units += row.quantity;
        self.revenue = self.revenue.saturating_add(row.revenue);
        self.margin = self.margin.saturating_add(row.margin);
    }

    fn finish(mut self) -> Self {
        self.margin_percent = self.margin.percent_of(self.revenue);
        self
    }
}

/// A named breakdown entry (category, channel, month, or product).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub key: String,
    #[serde(flatten)]
    pub totals: SalesTotals,
}

/// Summary of the loaded sales report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    pub generated_at: DateTime<Utc>,
    pub totals: SalesTotals,
    pub by_category: Vec<Breakdown>,
    pub by_channel: Vec<Breakdown>,
    pub by_month: Vec<Breakdown>,
    pub top_products: Vec<Breakdown>,
}

impl SalesReport {
    /// Builds the summary. Breakdowns are sorted by key; top products by
    /// revenue descending, ties broken by name.
    pub fn from_rows(rows: &[ReportRow], generated_at: DateTime<Utc>, top_n: usize) -> Self {
        let mut totals = SalesTotals::default();
        let mut by_category: BTreeMap<&str, SalesTotals> = BTreeMap::new();
        let mut by_channel: BTreeMap<&str, SalesTotals> = BTreeMap::new();
        let mut by_month: BTreeMap<&str, SalesTotals> = BTreeMap::new();
        let mut by_product: BTreeMap<&str, SalesTotals> = BTreeMap::new();

        for row in rows {
            totals.add(row);
            by_category.entry(row.category.as_str()).or_default().add(row);
            by_channel.entry(row.channel.as_str()).or_default().add(row);
            by_month.entry(row.month.as_str()).or_default().add(row);
            by_product.entry(row.product_name.as_str()).or_default().add(row);
        }

        let mut top_products = into_breakdowns(by_product);
        top_products.sort_by(|a, b| {
            b.totals
                .revenue
                .cmp(&a.totals.revenue)
                .then_with(|| a.key.cmp(&b.key))
        });
        top_products.truncate(top_n);

        Self {
            generated_at,
            totals: totals.finish(),
            by_category: into_breakdowns(by_category),
            by_channel: into_breakdowns(by_channel),
            by_month: into_breakdowns(by_month),
            top_products,
        }
    }
}

fn into_breakdowns(groups: BTreeMap<&str, SalesTotals>) -> Vec<Breakdown> {
    groups
        .into_iter()
        .map(|(key, totals)| Breakdown {
            key: key.to_string(),
            totals: totals.finish(),
        })
        .collect()
}
