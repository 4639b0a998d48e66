//! Product domain types and the read/write normalization rules.
//!
//! Reads and writes are asymmetric: a stored `NULL` in an
//! optional text column reads back as `""`, while an absent or blank input
//! is written as `NULL`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use uuid::Uuid;

use crate::CoreError;

pub const MSG_DUPLICATE_SKU: &str = "SKU already registered";
pub const MSG_NOT_FOUND: &str = "Product not found";
pub const MSG_UPDATED: &str = "Product updated successfully";

/// Largest value a `NUMERIC(10,2)` price column can hold: 99999999.99.
const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// A row from the `products` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub id: Uuid,
    pub sku: Option<String>,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    /// File name inside the upload directory, not a path.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public read shape of a product.
///
/// `id` is omitted from JSON when absent. A price that cannot be represented
/// as a float is `NaN`, which `serde_json` writes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub image: String,
}

impl ProductView {
    /// The all-default shape returned on the wire when a lookup finds nothing.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            id: None,
            sku: String::new(),
            name: String::new(),
            price: f64::NAN,
            description: String::new(),
            image: String::new(),
        }
    }
}

impl From<ProductRecord> for ProductView {
    fn from(record: ProductRecord) -> Self {
        Self {
            id: Some(record.id),
            sku: record.sku.unwrap_or_default(),
            name: record.name,
            price: record.price.to_f64().unwrap_or(f64::NAN),
            description: record.description.unwrap_or_default(),
            image: record.image.unwrap_or_default(),
        }
    }
}

/// Input to product creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub sku: Option<String>,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Input to a full product update.
///
/// `sku`, `name`, `price` and `description` overwrite the stored values
/// unconditionally (`None` clears). `image` is only written when `Some`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductUpdate {
    pub id: Uuid,
    pub sku: Option<String>,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// How a single product is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductKey {
    Id(Uuid),
    Sku(String),
}

impl std::fmt::Display for ProductKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductKey::Id(id) => write!(f, "id={id}"),
            ProductKey::Sku(sku) => write!(f, "sku={sku}"),
        }
    }
}

/// Result of a create or update. Business-rule failures are reported here
/// with `success: false` instead of as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WriteOutcome {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    #[must_use]
    pub fn ok_with(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
        }
    }

    #[must_use]
    pub fn rejected(message: &str) -> Self {
        Self {
            success: false,
            message: Some(message.to_string()),
        }
    }
}

/// Parse a caller-supplied price into a non-negative two-decimal value.
///
/// # Errors
///
/// Returns [`CoreError::InvalidPrice`] if the input is not a decimal number,
/// is negative, or does not fit the price column.
pub fn parse_price(raw: &str) -> Result<Decimal, CoreError> {
    let trimmed = raw.trim();
    // `Decimal` parsing tolerates `_` digit separators; prices must not.
    if trimmed.contains('_') {
        return Err(CoreError::InvalidPrice(format!("'{trimmed}' is not a number")));
    }
    let value = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| CoreError::InvalidPrice(format!("'{trimmed}' is not a number")))?;

    if value.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if value.is_sign_negative() {
        return Err(CoreError::InvalidPrice(format!(
            "'{trimmed}' must not be negative"
        )));
    }

    // NUMERIC rounds half away from zero; match it so the echoed value is
    // what gets stored.
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded > MAX_PRICE {
        return Err(CoreError::InvalidPrice(format!("'{trimmed}' is too large")));
    }
    Ok(rounded)
}

/// Require a non-blank product name, returning it trimmed.
///
/// # Errors
///
/// Returns [`CoreError::MissingField`] if the name is absent or blank.
pub fn require_name(raw: Option<&str>) -> Result<String, CoreError> {
    match raw.map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(CoreError::MissingField("name")),
    }
}

/// Blank optional text is stored as absent.
#[must_use]
pub fn normalize_optional(raw: Option<String>) -> Option<String> {
    raw.filter(|v| !v.trim().is_empty())
}

/// SKUs are compared exactly, so surrounding whitespace is dropped before
/// they reach the store.
#[must_use]
pub fn normalize_sku(raw: Option<String>) -> Option<String> {
    normalize_optional(raw).map(|v| v.trim().to_string())
}
