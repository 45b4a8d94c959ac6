//! Product catalog records.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};
use crate::money::Cents;

/// Product row exactly as read from the products CSV.
///
/// Headers follow the store export (`ID_Produto`, `Nome_Produto`, ...);
/// English snake_case headers are accepted too.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProduct {
    #[serde(rename = "ID_Produto", alias = "product_id")]
    pub product_id: String,
    #[serde(rename = "Nome_Produto", alias = "name")]
    pub name: String,
    #[serde(rename = "Categoria", alias = "category", default)]
    pub category: String,
    #[serde(rename = "Preco_Custo", alias = "cost_price")]
    pub cost_price: String,
    #[serde(rename = "Fornecedor", alias = "supplier", default)]
    pub supplier: String,
    #[serde(rename = "Status", alias = "status", default)]
    pub status: String,
}

/// A parsed product. Column limits mirror the `processed_products` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct Product {
    #[validate(length(min = 1, max = 10))]
    pub product_id: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 50))]
    pub category: String,
    #[validate(custom(function = "validate_amount"))]
    pub cost_price: Cents,
    #[validate(length(max = 100))]
    pub supplier: String,
    #[validate(length(max = 20))]
    pub status: String,
}

impl TryFrom<RawProduct> for Product {
    type Error = Error;

    fn try_from(raw: RawProduct) -> Result<Self> {
        let cost_price = raw.cost_price.parse::<Cents>().map_err(|e| {
            Error::parse(format!("product {}: cost price: {}", raw.product_id, e))
        })?;

        Ok(Self {
            product_id: raw.product_id.trim().to_string(),
            name: raw.name.trim().to_string(),
            category: raw.category.trim().to_string(),
            cost_price,
            supplier: raw.supplier.trim().to_string(),
            status: raw.status.trim().to_string(),
        })
    }
}

impl Product {
    /// Runs the column-limit checks.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::validation(format!("product {}: {}", self.product_id, e)))
    }
}

/// Amounts must be non-negative and fit a `Decimal(10, 2)` column.
pub(crate) fn validate_amount(amount: &Cents) -> std::result::Result<(), ValidationError> {
    if amount.is_negative() {
        let mut err = ValidationError::new("negative_amount");
        err.message = Some(format!("amount {} must not be negative", amount).into());
        return Err(err);
    }
    if !amount.fits_column() {
        let mut err = ValidationError::new("amount_out_of_range");
        err.message = Some(format!("amount {} exceeds {}", amount, Cents::MAX).into());
        return Err(err);
    }
    Ok(())
}
