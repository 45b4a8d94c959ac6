//! Low-performance product detection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::ReportRow;

/// Products selling fewer total units than this are flagged.
pub const LOW_PERFORMANCE_THRESHOLD: i64 = 2;

/// Status label attached to every alert row.
pub const LOW_PERFORMANCE_STATUS: &str = "LOW PERFORMANCE (< 2)";

/// Units sold per (product name, category) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSalesTotal {
    pub product_name: String,
    pub category: String,
    pub total_units_sold: i64,
}

/// One row of the `low_performance_products` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowPerformanceAlert {
    pub product_name: String,
    pub category: String,
    pub total_units_sold: i64,
    pub status: String,
    pub analyzed_at: DateTime<Utc>,
}

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// `count` products were flagged and written to the alert table.
    Alerted { count: usize },
    /// Nothing below the threshold.
    NoAlert,
}

impl AnalysisOutcome {
    pub fn from_alerts(alerts: &[LowPerformanceAlert]) -> Self {
        if alerts.is_empty() {
            Self::NoAlert
        } else {
            Self::Alerted {
                count: alerts.len(),
            }
        }
    }

    /// Human-readable task result.
    pub fn message(&self) -> String {
        match self {
            Self::Alerted { count } => format!(
                "Alert and load of {} low-performance products completed.",
                count
            ),
            Self::NoAlert => "No low-performance alert.".to_string(),
        }
    }
}

/// Sums units per (product name, category), the same grouping the
/// warehouse aggregation query uses. Output is ordered by the pair.
pub fn aggregate_units(rows: &[ReportRow]) -> Vec<ProductSalesTotal> {
    let mut totals: BTreeMap<(&str, &str), i64> = BTreeMap::new();
    for row in rows {
        *totals
            .entry((row.product_name.as_str(), row.category.as_str()))
            .or_insert(0) += row.quantity;
    }

    totals
        .into_iter()
        .map(|((product_name, category), total_units_sold)| ProductSalesTotal {
            product_name: product_name.to_string(),
            category: category.to_string(),
            total_units_sold,
        })
        .collect()
}

/// Keeps the pairs whose total is below `threshold` and stamps them.
pub fn detect_low_performers(
    totals: &[ProductSalesTotal],
    threshold: i64,
    analyzed_at: DateTime<Utc>,
) -> Vec<LowPerformanceAlert> {
    totals
        .iter()
        .filter(|t| t.total_units_sold < threshold)
        .map(|t| LowPerformanceAlert {
            product_name: t.product_name.clone(),
            category: t.category.clone(),
            total_units_sold: t.total_units_sold,
            status: LOW_PERFORMANCE_STATUS.to_string(),
            analyzed_at,
        })
        .collect()
}

/// Fixed-width table of alerts for the log.
pub fn format_alert_table(alerts: &[LowPerformanceAlert]) -> String {
    let name_width = alerts
        .iter()
        .map(|a| a.product_name.chars().count())
        .chain(std::iter::once("product_name".len()))
        .max()
        .unwrap_or(0);
    let category_width = alerts
        .iter()
        .map(|a| a.category.chars().count())
        .chain(std::iter::once("category".len()))
        .max()
        .unwrap_or(0);

    let mut out = format!(
        "{:<nw$}  {:<cw$}  {:>16}  {}",
        "product_name",
        "category",
        "total_units_sold",
        "status",
        nw = name_width,
        cw = category_width
    );
    for alert in alerts {
        out.push('\n');
        out.push_str(&format!(
            "{:<nw$}  {:<cw$}  {:>16}  {}",
            alert.product_name,
            alert.category,
            alert.total_units_sold,
            alert.status,
            nw = name_width,
            cw = category_width
        ));
    }
    out
}
