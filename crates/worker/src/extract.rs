//! CSV extraction for the products and sales sources.
//!
//! Malformed rows are counted and skipped; a missing file, a missing
//! required column, or an I/O error fails the extraction.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use pipeline_core::{Error, Product, RawProduct, RawSale, Result, Sale};
use serde::de::DeserializeOwned;
use telemetry::metrics;
use tracing::{debug, info, warn};

/// Required product columns as (source header, accepted alias).
const PRODUCT_COLUMNS: &[(&str, &str)] = &[
    ("ID_Produto", "product_id"),
    ("Nome_Produto", "name"),
    ("Preco_Custo", "cost_price"),
];

/// Required sale columns as (source header, accepted alias).
const SALE_COLUMNS: &[(&str, &str)] = &[
    ("ID_Venda", "sale_id"),
    ("ID_Produto", "product_id"),
    ("Quantidade_Vendida", "quantity"),
    ("Preco_Venda", "unit_price"),
    ("Data_Venda", "sale_date"),
];

/// Records read from one source plus the number of rows skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
    pub records: Vec<T>,
    pub rejected: usize,
}

impl<T> Extracted<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read the products CSV.
pub fn read_products(path: &Path) -> Result<Extracted<Product>> {
    let extracted = read_file::<RawProduct, Product>(path, "products", PRODUCT_COLUMNS)?;
    metrics().products_extracted.inc_by(extracted.len() as u64);
    Ok(extracted)
}

/// Read the sales CSV.
pub fn read_sales(path: &Path) -> Result<Extracted<Sale>> {
    let extracted = read_file::<RawSale, Sale>(path, "sales", SALE_COLUMNS)?;
    metrics().sales_extracted.inc_by(extracted.len() as u64);
    Ok(extracted)
}

/// Parse products from any reader (used for in-memory sources).
pub fn parse_products<R: Read>(reader: R) -> Result<Extracted<Product>> {
    parse_records::<_, RawProduct, Product>(reader, "products", PRODUCT_COLUMNS)
}

/// Parse sales from any reader (used for in-memory sources).
pub fn parse_sales<R: Read>(reader: R) -> Result<Extracted<Sale>> {
    parse_records::<_, RawSale, Sale>(reader, "sales", SALE_COLUMNS)
}

fn read_file<Raw, T>(path: &Path, source: &str, required: &[(&str, &str)]) -> Result<Extracted<T>>
where
    Raw: DeserializeOwned,
    T: TryFrom<Raw, Error = Error>,
{
    let file = File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("{} source {}: {}", source, path.display(), e),
        ))
    })?;

    let extracted = parse_records::<_, Raw, T>(file, source, required)?;

    info!(
        source = source,
        path = %path.display(),
        records = extracted.records.len(),
        rejected = extracted.rejected,
        "Extracted CSV source"
    );
    if extracted.is_empty() {
        warn!(source = source, path = %path.display(), "CSV source has no usable rows");
    }

    Ok(extracted)
}

fn parse_records<R, Raw, T>(reader: R, source: &str, required: &[(&str, &str)]) -> Result<Extracted<T>>
where
    R: Read,
    Raw: DeserializeOwned,
    T: TryFrom<Raw, Error = Error>,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    check_headers(&headers, source, required)?;

    let mut records = Vec::new();
    let mut rejected = 0;

    for (idx, row) in rdr.deserialize::<Raw>().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let raw = match row {
            Ok(raw) => raw,
            Err(e) if is_row_error(&e) => {
                warn!(source = source, line = line, error = %e, "Skipping malformed row");
                rejected += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        match T::try_from(raw) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(source = source, line = line, error = %e, "Skipping unparseable row");
                rejected += 1;
            }
        }
    }

    if rejected > 0 {
        metrics().rows_rejected.inc_by(rejected as u64);
    }
    debug!(source = source, records = records.len(), rejected = rejected, "Parsed CSV rows");

    Ok(Extracted { records, rejected })
}

fn check_headers(headers: &StringRecord, source: &str, required: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .filter(|(name, alias)| !headers.iter().any(|h| h == *name || h == *alias))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "{} source is missing columns: {}",
            source,
            missing.join(", ")
        )))
    }
}

/// Errors confined to a single row; anything else aborts the read.
fn is_row_error(e: &csv::Error) -> bool {
    matches!(
        e.kind(),
        csv::ErrorKind::Deserialize { .. }
            | csv::ErrorKind::UnequalLengths { .. }
            | csv::ErrorKind::Utf8 { .. }
    )
}
