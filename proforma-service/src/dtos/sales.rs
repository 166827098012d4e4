use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAdvanceRequest {
    pub advance: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddExpenseRequest {
    #[validate(length(min = 1, max = 500, message = "Concept must be 1-500 characters"))]
    pub concept: String,
    pub amount: Decimal,
}
