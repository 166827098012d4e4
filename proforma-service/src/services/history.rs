//! Read side of committed sales, and the single-row edits made from it.
//!
//! Figures are always recomputed from a sale's current children, so an
//! expense added or removed after the commit shows up on the next read with
//! nothing to invalidate.

use crate::domain::{money, validation, Priced, ValidationError};
use crate::models::{CreateExpense, Customer, DocumentType, Expense, LineItem, Sale};
use crate::services::error::SalesError;
use crate::services::metrics::EXPENSE_EVENTS_TOTAL;
use crate::services::store::{StoreError, StoreGateway};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument};
use uuid::Uuid;

/// Monotonic counter bumped after every write that changes what the history
/// shows. Clients compare it against the revision they last rendered.
#[derive(Clone)]
pub struct HistoryRevision {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for HistoryRevision {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }
}

impl HistoryRevision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn bump(&self) -> u64 {
        self.tx.send_modify(|revision| *revision += 1);
        self.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

/// One sale with its children and the figures derived from them.
#[derive(Debug, Clone, Serialize)]
pub struct SaleRecord {
    pub sale: Sale,
    pub document_type: DocumentType,
    pub customer: Option<Customer>,
    pub items: Vec<LineItem>,
    pub expenses: Vec<Expense>,
    pub total: Decimal,
    pub expenses_total: Decimal,
    pub balance_due: Decimal,
    pub profit: Decimal,
}

impl SaleRecord {
    fn assemble(
        sale: Sale,
        customer: Option<Customer>,
        mut items: Vec<LineItem>,
        expenses: Vec<Expense>,
    ) -> Self {
        for item in &mut items {
            let quantity = <LineItem as Priced>::quantity(item);
            item.line_total = money::line_total(item.unit_price, quantity);
        }
        items.sort_by_key(|item| item.sort_order);

        let total = if items.is_empty() {
            sale.total_amount
        } else {
            money::sale_total(&items)
        };
        let expenses_total = money::expenses_total(&expenses);

        Self {
            document_type: sale.document_type(),
            balance_due: money::balance_due(total, sale.advance_amount),
            profit: money::profit(total, expenses_total),
            sale,
            customer,
            items,
            expenses,
            total,
            expenses_total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub revision: u64,
    pub sales: Vec<SaleRecord>,
}

#[derive(Clone)]
pub struct HistoryPresenter {
    gateway: StoreGateway,
    revision: HistoryRevision,
}

impl HistoryPresenter {
    pub fn new(gateway: StoreGateway, revision: HistoryRevision) -> Self {
        Self { gateway, revision }
    }

    pub fn revision(&self) -> &HistoryRevision {
        &self.revision
    }

    /// Every sale with its customer and children, newest issue date first.
    #[instrument(skip(self))]
    pub async fn list_sales(&self) -> Result<HistoryPage, SalesError> {
        let revision = self.revision.current();
        let store = self.gateway.store();

        let sales = self.gateway.read("list_sales", || store.list_sales()).await?;
        let sale_ids: Vec<Uuid> = sales.iter().map(|s| s.sale_id).collect();

        let customers: HashMap<Uuid, Customer> = self
            .gateway
            .read("list_customers", || store.list_customers())
            .await?
            .into_iter()
            .map(|c| (c.customer_id, c))
            .collect();
        let mut items = group_by_sale(
            self.gateway
                .read("list_line_items", || store.list_line_items(&sale_ids))
                .await?,
            |item| item.sale_id,
        );
        let mut expenses = group_by_sale(
            self.gateway
                .read("list_expenses", || store.list_expenses(&sale_ids))
                .await?,
            |expense| expense.sale_id,
        );

        let sales: Vec<SaleRecord> = sales
            .into_iter()
            .map(|sale| {
                let customer = customers.get(&sale.customer_id).cloned();
                let sale_items = items.remove(&sale.sale_id).unwrap_or_default();
                let sale_expenses = expenses.remove(&sale.sale_id).unwrap_or_default();
                SaleRecord::assemble(sale, customer, sale_items, sale_expenses)
            })
            .collect();

        tracing::debug!(sale_count = sales.len(), revision, "History loaded");
        Ok(HistoryPage { revision, sales })
    }

    /// A single sale with its children; unknown ids are a validation failure.
    #[instrument(skip(self))]
    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleRecord, SalesError> {
        let store = self.gateway.store();
        let sale = self
            .gateway
            .read("get_sale", || store.get_sale(sale_id))
            .await?
            .ok_or(ValidationError::UnknownSale(sale_id))?;

        let ids = [sale_id];
        let customer = self
            .gateway
            .read("get_customer", || store.get_customer(sale.customer_id))
            .await?;
        let items = self
            .gateway
            .read("list_line_items", || store.list_line_items(&ids))
            .await?;
        let expenses = self
            .gateway
            .read("list_expenses", || store.list_expenses(&ids))
            .await?;

        Ok(SaleRecord::assemble(sale, customer, items, expenses))
    }

    /// Replace the advance received on a sale. The new value is checked
    /// against the sale's current total.
    #[instrument(skip(self))]
    pub async fn update_advance(
        &self,
        sale_id: Uuid,
        advance: Decimal,
    ) -> Result<SaleRecord, SalesError> {
        let advance = money::round_currency(advance);
        let record = self.get_sale(sale_id).await?;
        validation::validate_advance(advance, record.total)?;

        self.gateway
            .write(
                "update_sale_advance",
                self.gateway.store().update_sale_advance(sale_id, advance),
            )
            .await
            .map_err(|e| unknown_on_missing(e, ValidationError::UnknownSale(sale_id)))?;
        let revision = self.revision.bump();

        info!(
            sale_id = %sale_id,
            advance = %advance,
            total = %record.total,
            revision,
            "Sale advance updated"
        );

        let mut sale = record.sale;
        sale.advance_amount = advance;
        Ok(SaleRecord::assemble(
            sale,
            record.customer,
            record.items,
            record.expenses,
        ))
    }

    #[instrument(skip(self, concept))]
    pub async fn add_expense(
        &self,
        sale_id: Uuid,
        concept: &str,
        amount: Decimal,
    ) -> Result<Expense, SalesError> {
        let concept = concept.trim();
        let amount = money::round_currency(amount);
        validation::validate_expense(concept, amount)?;

        let store = self.gateway.store();
        if self
            .gateway
            .read("get_sale", || store.get_sale(sale_id))
            .await?
            .is_none()
        {
            return Err(ValidationError::UnknownSale(sale_id).into());
        }

        let input = CreateExpense {
            sale_id,
            concept: concept.to_string(),
            amount,
        };
        let expense = self
            .gateway
            .write("insert_expense", store.insert_expense(&input))
            .await?;
        let revision = self.revision.bump();
        EXPENSE_EVENTS_TOTAL.with_label_values(&["recorded"]).inc();

        info!(
            sale_id = %sale_id,
            expense_id = %expense.expense_id,
            amount = %amount,
            revision,
            "Expense recorded"
        );
        Ok(expense)
    }

    #[instrument(skip(self))]
    pub async fn delete_expense(&self, expense_id: Uuid) -> Result<(), SalesError> {
        let store = self.gateway.store();
        let expense = self
            .gateway
            .read("get_expense", || store.get_expense(expense_id))
            .await?
            .ok_or(ValidationError::UnknownExpense(expense_id))?;

        self.gateway
            .write("delete_expense", store.delete_expense(expense_id))
            .await
            .map_err(|e| unknown_on_missing(e, ValidationError::UnknownExpense(expense_id)))?;
        let revision = self.revision.bump();
        EXPENSE_EVENTS_TOTAL.with_label_values(&["deleted"]).inc();

        info!(
            sale_id = %expense.sale_id,
            expense_id = %expense_id,
            amount = %expense.amount,
            revision,
            "Expense deleted"
        );
        Ok(())
    }
}

fn group_by_sale<T>(rows: Vec<T>, sale_id: impl Fn(&T) -> Uuid) -> HashMap<Uuid, Vec<T>> {
    let mut grouped: HashMap<Uuid, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(sale_id(&row)).or_default().push(row);
    }
    grouped
}

/// A row that vanished between the existence check and the write is
/// reported the same way as one that never existed.
fn unknown_on_missing(err: StoreError, unknown: ValidationError) -> SalesError {
    match err {
        StoreError::NotFound { .. } => unknown.into(),
        other => other.into(),
    }
}
