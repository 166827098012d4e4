//! Sale model: the header of a quote or contract.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Document type of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Quote,
    Contract,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Quote => "quote",
            DocumentType::Contract => "contract",
        }
    }

    /// Unknown values read back from storage are treated as quotes, the
    /// non-binding kind.
    pub fn from_string(s: &str) -> Self {
        match s {
            "contract" => DocumentType::Contract,
            _ => DocumentType::Quote,
        }
    }
}

/// Persisted sale header.
///
/// `total_amount` is the line-item sum written at commit time. Readers
/// recompute the total from the sale's line items and only fall back to this
/// column for a sale that has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Sale {
    pub sale_id: Uuid,
    pub customer_id: Uuid,
    pub document_type: String,
    pub total_amount: Decimal,
    pub advance_amount: Decimal,
    pub delivery_date: Option<NaiveDate>,
    pub issued_utc: DateTime<Utc>,
}

impl Sale {
    pub fn document_type(&self) -> DocumentType {
        DocumentType::from_string(&self.document_type)
    }
}

/// Input for writing a sale header.
#[derive(Debug, Clone)]
pub struct CreateSale {
    pub customer_id: Uuid,
    pub document_type: DocumentType,
    pub total_amount: Decimal,
    pub advance_amount: Decimal,
    pub delivery_date: Option<NaiveDate>,
}
