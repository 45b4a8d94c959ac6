//! Cleaning, derivation, and the sales/products join.

use std::collections::{HashMap, HashSet};

use pipeline_core::{ProcessedSale, Product, ReportRow, Result, Sale};
use serde::Serialize;
use telemetry::metrics;
use tracing::{debug, info, warn};

/// Row counts observed while transforming.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformStats {
    pub products_in: usize,
    pub products_rejected: usize,
    pub duplicate_products: usize,
    pub sales_in: usize,
    pub sales_rejected: usize,
    pub duplicate_sales: usize,
    /// Valid sales whose product is not in the catalog.
    pub orphan_sales: usize,
}

/// Output of the transformation step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformedData {
    pub products: Vec<Product>,
    pub sales: Vec<ProcessedSale>,
    pub report: Vec<ReportRow>,
    pub stats: TransformStats,
}

/// Validates both record sets, derives sale columns, and joins sales to
/// products. Input order is preserved; the first occurrence of a
/// duplicated id wins.
pub fn transform(products: &[Product], sales: &[Sale]) -> TransformedData {
    let mut stats = TransformStats {
        products_in: products.len(),
        sales_in: sales.len(),
        ..Default::default()
    };

    let mut seen_products = HashSet::new();
    let mut valid_products = Vec::with_capacity(products.len());
    for product in products {
        if let Err(e) = product.check() {
            warn!(error = %e, "Rejecting product");
            stats.products_rejected += 1;
            continue;
        }
        if !seen_products.insert(product.product_id.as_str()) {
            debug!(product_id = %product.product_id, "Dropping duplicate product");
            stats.duplicate_products += 1;
            continue;
        }
        valid_products.push(product.clone());
    }

    let catalog: HashMap<&str, &Product> = valid_products
        .iter()
        .map(|p| (p.product_id.as_str(), p))
        .collect();

    let mut seen_sales = HashSet::new();
    let mut processed_sales = Vec::with_capacity(sales.len());
    let mut report = Vec::with_capacity(sales.len());
    for sale in sales {
        let (processed, joined) = match derive_sale(sale, &catalog) {
            Ok(derived) => derived,
            Err(e) => {
                warn!(error = %e, "Rejecting sale");
                stats.sales_rejected += 1;
                continue;
            }
        };
        if !seen_sales.insert(sale.sale_id.as_str()) {
            debug!(sale_id = %sale.sale_id, "Dropping duplicate sale");
            stats.duplicate_sales += 1;
            continue;
        }

        match joined {
            Some(row) => report.push(row),
            None => {
                warn!(
                    sale_id = %sale.sale_id,
                    product_id = %sale.product_id,
                    "Sale references unknown product, excluded from report"
                );
                stats.orphan_sales += 1;
            }
        }
        processed_sales.push(processed);
    }

    let rejected = stats.products_rejected + stats.sales_rejected;
    if rejected > 0 {
        metrics().rows_rejected.inc_by(rejected as u64);
    }
    metrics().orphan_sales.inc_by(stats.orphan_sales as u64);

    info!(
        products = valid_products.len(),
        sales = processed_sales.len(),
        report_rows = report.len(),
        products_rejected = stats.products_rejected,
        sales_rejected = stats.sales_rejected,
        orphan_sales = stats.orphan_sales,
        "Transformed data"
    );

    TransformedData {
        products: valid_products,
        sales: processed_sales,
        report,
        stats,
    }
}

/// Validates a sale, derives its columns, and joins it when the product is
/// known. Amounts that leave the column range reject the whole sale.
fn derive_sale(
    sale: &Sale,
    catalog: &HashMap<&str, &Product>,
) -> Result<(ProcessedSale, Option<ReportRow>)> {
    sale.check()?;
    let processed = ProcessedSale::try_from(sale.clone())?;
    let joined = catalog
        .get(sale.product_id.as_str())
        .map(|product| ReportRow::join(&processed, product))
        .transpose()?;
    Ok((processed, joined))
}
