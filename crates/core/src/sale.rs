//! Sales records and their derived columns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::money::Cents;
use crate::product::validate_amount;

/// Largest quantity accepted on a single sale row.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Accepted sale date layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Sale row exactly as read from the sales CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSale {
    #[serde(rename = "ID_Venda", alias = "sale_id")]
    pub sale_id: String,
    #[serde(rename = "ID_Produto", alias = "product_id")]
    pub product_id: String,
    #[serde(rename = "Quantidade_Vendida", alias = "quantity")]
    pub quantity: String,
    #[serde(rename = "Preco_Venda", alias = "unit_price")]
    pub unit_price: String,
    #[serde(rename = "Data_Venda", alias = "sale_date")]
    pub sale_date: String,
    #[serde(rename = "Canal_Venda", alias = "channel", default)]
    pub channel: String,
}

/// A parsed sale. Column limits mirror the `processed_sales` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct Sale {
    #[validate(length(min = 1, max = 10))]
    pub sale_id: String,
    #[validate(length(min = 1, max = 10))]
    pub product_id: String,
    #[validate(range(min = 0, max = MAX_QUANTITY))]
    pub quantity: i64,
    #[validate(custom(function = "validate_amount"))]
    pub unit_price: Cents,
    pub sale_date: NaiveDate,
    #[validate(length(max = 20))]
    pub channel: String,
}

impl TryFrom<RawSale> for Sale {
    type Error = Error;

    fn try_from(raw: RawSale) -> Result<Self> {
        let sale_id = raw.sale_id.trim().to_string();

        let quantity = raw
            .quantity
            .trim()
            .parse::<i64>()
            .map_err(|e| Error::parse(format!("sale {}: quantity: {}", sale_id, e)))?;
        let unit_price = raw
            .unit_price
            .parse::<Cents>()
            .map_err(|e| Error::parse(format!("sale {}: unit price: {}", sale_id, e)))?;
        let sale_date = parse_date(&raw.sale_date)
            .ok_or_else(|| Error::parse(format!("sale {}: invalid date '{}'", sale_id, raw.sale_date)))?;

        Ok(Self {
            sale_id,
            product_id: raw.product_id.trim().to_string(),
            quantity,
            unit_price,
            sale_date,
            channel: raw.channel.trim().to_string(),
        })
    }
}

impl Sale {
    /// Runs the column-limit checks.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::validation(format!("sale {}: {}", self.sale_id, e)))
    }

    /// Quantity times unit price.
    pub fn revenue(&self) -> Result<Cents> {
        self.unit_price
            .checked_mul(self.quantity)
            .map_err(|e| Error::validation(format!("sale {}: revenue: {}", self.sale_id, e)))
    }

    /// Month bucket, `YYYY-MM`.
    pub fn month(&self) -> String {
        self.sale_date.format("%Y-%m").to_string()
    }
}

/// A validated sale with its derived columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedSale {
    pub sale: Sale,
    pub revenue: Cents,
    pub month: String,
}

impl TryFrom<Sale> for ProcessedSale {
    type Error = Error;

    fn try_from(sale: Sale) -> Result<Self> {
        let revenue = sale.revenue()?;
        let month = sale.month();
        Ok(Self {
            sale,
            revenue,
            month,
        })
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
