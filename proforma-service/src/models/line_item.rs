//! Line item model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One priced unit of work on a sale. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LineItem {
    pub line_item_id: Uuid,
    pub sale_id: Uuid,
    pub description: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

/// Input for writing a line item as part of a sale commit.
#[derive(Debug, Clone)]
pub struct CreateLineItem {
    pub sale_id: Uuid,
    pub description: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub sort_order: i32,
}
