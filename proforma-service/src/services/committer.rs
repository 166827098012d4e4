//! Turns a draft into a persisted sale.
//!
//! The header, its line items and its expenses are written through one
//! [`StoreTransaction`]. Any failure after `begin` rolls the whole unit back,
//! so a failed commit never leaves a header or orphaned children behind.

use crate::domain::validation::{self, CommitCandidate};
use crate::domain::{money, DraftBuilder, ExpenseSlot, ItemSlot};
use crate::models::{
    CreateExpense, CreateLineItem, CreateSale, DocumentType, Expense, LineItem, Sale,
};
use crate::services::error::SalesError;
use crate::services::history::HistoryRevision;
use crate::services::metrics::{
    COMMIT_FAILURES_TOTAL, EXPENSE_EVENTS_TOTAL, SALES_COMMITTED_TOTAL, SALE_AMOUNT_TOTAL,
};
use crate::services::store::{StoreError, StoreGateway, StoreTransaction};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub customer_id: Uuid,
    pub document_type: DocumentType,
    pub advance: Decimal,
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommittedSale {
    pub sale: Sale,
    pub items: Vec<LineItem>,
    pub expenses: Vec<Expense>,
}

/// The valid slots of a draft with every amount rounded to cents, so the
/// total that is checked is the total that gets stored.
struct Snapshot {
    items: Vec<ItemSlot>,
    expenses: Vec<ExpenseSlot>,
}

impl Snapshot {
    fn take(draft: &DraftBuilder) -> Self {
        Self {
            items: draft
                .valid_items()
                .map(|slot| ItemSlot {
                    description: slot.description.trim().to_string(),
                    unit_price: money::round_currency(slot.unit_price),
                    quantity: slot.quantity,
                })
                .collect(),
            expenses: draft
                .valid_expenses()
                .map(|slot| ExpenseSlot {
                    concept: slot.concept.trim().to_string(),
                    amount: money::round_currency(slot.amount),
                })
                .collect(),
        }
    }
}

#[derive(Clone)]
pub struct SaleCommitter {
    gateway: StoreGateway,
    revision: HistoryRevision,
}

impl SaleCommitter {
    pub fn new(gateway: StoreGateway, revision: HistoryRevision) -> Self {
        Self { gateway, revision }
    }

    /// Validate and persist `draft`. On success the draft is reset; on any
    /// failure it is left exactly as it was.
    #[instrument(
        skip(self, draft, request),
        fields(customer_id = %request.customer_id, document_type = request.document_type.as_str())
    )]
    pub async fn commit(
        &self,
        draft: &mut DraftBuilder,
        request: CommitRequest,
    ) -> Result<CommittedSale, SalesError> {
        match self.try_commit(draft, &request).await {
            Ok(committed) => {
                draft.reset();
                let revision = self.revision.bump();

                let document_type = committed.sale.document_type().as_str();
                SALES_COMMITTED_TOTAL
                    .with_label_values(&[document_type])
                    .inc();
                SALE_AMOUNT_TOTAL
                    .with_label_values(&[document_type])
                    .inc_by(committed.sale.total_amount.to_f64().unwrap_or(0.0));
                EXPENSE_EVENTS_TOTAL
                    .with_label_values(&["recorded"])
                    .inc_by(committed.expenses.len() as u64);

                info!(
                    sale_id = %committed.sale.sale_id,
                    total = %committed.sale.total_amount,
                    advance = %committed.sale.advance_amount,
                    item_count = committed.items.len(),
                    expense_count = committed.expenses.len(),
                    revision,
                    "Sale committed"
                );
                Ok(committed)
            }
            Err(e) => {
                COMMIT_FAILURES_TOTAL
                    .with_label_values(&[e.reason()])
                    .inc();
                warn!(error = %e, reason = e.reason(), "Sale commit rejected");
                Err(e)
            }
        }
    }

    async fn try_commit(
        &self,
        draft: &DraftBuilder,
        request: &CommitRequest,
    ) -> Result<CommittedSale, SalesError> {
        let snapshot = Snapshot::take(draft);
        let store = self.gateway.store();

        let customer = self
            .gateway
            .read("get_customer", || store.get_customer(request.customer_id))
            .await?;

        let total = money::sale_total(&snapshot.items);
        let advance = money::round_currency(request.advance);
        validation::validate_commit(&CommitCandidate {
            customer_id: request.customer_id,
            customer_exists: customer.is_some(),
            items: &snapshot.items,
            expenses: &snapshot.expenses,
            total,
            advance,
        })?;

        let header = CreateSale {
            customer_id: request.customer_id,
            document_type: request.document_type,
            total_amount: total,
            advance_amount: advance,
            delivery_date: request.delivery_date,
        };

        let mut tx = self.gateway.write("begin", store.begin()).await?;
        match self.write_rows(&mut *tx, &header, &snapshot).await {
            Ok(committed) => {
                self.gateway.settle("commit", tx.commit()).await?;
                Ok(committed)
            }
            Err(e) => {
                if let Err(rollback_err) = self.gateway.write("rollback", tx.rollback()).await {
                    warn!(error = %rollback_err, "Rollback failed after commit error");
                }
                Err(e.into())
            }
        }
    }

    async fn write_rows(
        &self,
        tx: &mut dyn StoreTransaction,
        header: &CreateSale,
        snapshot: &Snapshot,
    ) -> Result<CommittedSale, StoreError> {
        let sale = self
            .gateway
            .write("insert_sale", tx.insert_sale(header))
            .await?;

        let mut items = Vec::with_capacity(snapshot.items.len());
        for (position, slot) in snapshot.items.iter().enumerate() {
            let input = CreateLineItem {
                sale_id: sale.sale_id,
                description: slot.description.clone(),
                unit_price: slot.unit_price,
                quantity: slot.quantity as i32,
                line_total: slot.line_total(),
                sort_order: position as i32,
            };
            items.push(
                self.gateway
                    .write("insert_line_item", tx.insert_line_item(&input))
                    .await?,
            );
        }

        let mut expenses = Vec::with_capacity(snapshot.expenses.len());
        for slot in &snapshot.expenses {
            let input = CreateExpense {
                sale_id: sale.sale_id,
                concept: slot.concept.clone(),
                amount: slot.amount,
            };
            expenses.push(
                self.gateway
                    .write("insert_expense", tx.insert_expense(&input))
                    .await?,
            );
        }

        Ok(CommittedSale {
            sale,
            items,
            expenses,
        })
    }
}
