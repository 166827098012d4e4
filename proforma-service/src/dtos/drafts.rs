use crate::domain::{DraftBuilder, DraftTotals, ExpenseSlot, ItemSlot};
use crate::models::DocumentType;
use crate::services::CommitRequest;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A draft as shown between edits: every slot, valid or not, plus the live
/// totals of the valid ones.
#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub draft_id: Uuid,
    pub items: Vec<ItemSlot>,
    pub expenses: Vec<ExpenseSlot>,
    pub totals: DraftTotals,
}

impl DraftResponse {
    pub fn new(draft_id: Uuid, draft: &DraftBuilder) -> Self {
        Self {
            draft_id,
            items: draft.items().to_vec(),
            expenses: draft.expenses().to_vec(),
            totals: draft.totals(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SlotAddedResponse {
    pub index: usize,
    pub draft: DraftResponse,
}

/// Slots may hold half-typed input, so only lengths are checked here. The
/// draft itself enforces price and quantity bounds.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[serde(default)]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: String,
    #[serde(default)]
    pub unit_price: Decimal,
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExpenseRequest {
    #[serde(default)]
    #[validate(length(max = 500, message = "Concept must be at most 500 characters"))]
    pub concept: String,
    #[serde(default)]
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommitDraftRequest {
    pub customer_id: Uuid,
    pub document_type: DocumentType,
    #[serde(default)]
    pub advance: Decimal,
    pub delivery_date: Option<NaiveDate>,
}

impl From<CommitDraftRequest> for CommitRequest {
    fn from(req: CommitDraftRequest) -> Self {
        Self {
            customer_id: req.customer_id,
            document_type: req.document_type,
            advance: req.advance,
            delivery_date: req.delivery_date,
        }
    }
}
