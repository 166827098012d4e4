//! Expense model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A cost incurred fulfilling a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub expense_id: Uuid,
    pub sale_id: Uuid,
    pub concept: String,
    pub amount: Decimal,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateExpense {
    pub sale_id: Uuid,
    pub concept: String,
    pub amount: Decimal,
}
