//! In-process record store.
//!
//! Backs local runs without a database (`STORE_BACKEND=memory`) and the test
//! suite. Transaction writes are applied immediately and recorded in an undo
//! log; rollback, or dropping the transaction uncommitted, reverses them.
//! [`MemoryStore::fail_next_insert`] and [`MemoryStore::stall_next_insert`]
//! inject a fault into the next insert on a collection;
//! [`MemoryStore::stall_next_commit`] delays the acknowledgement of an applied
//! commit.

use crate::models::{
    CreateExpense, CreateLineItem, CreateSale, Customer, Expense, LineItem, NewCustomer, Sale,
};
use crate::services::store::{Collection, RecordStore, StoreError, StoreTransaction};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
enum Fault {
    Fail,
    Stall(Duration),
}

#[derive(Default)]
struct Tables {
    customers: Vec<Customer>,
    sales: Vec<(u64, Sale)>,
    line_items: Vec<LineItem>,
    expenses: Vec<Expense>,
    next_seq: u64,
    injected_faults: HashMap<Collection, Fault>,
    commit_stall: Option<Duration>,
    health_stall: Option<Duration>,
}

impl Tables {
    /// Consume the fault armed for `collection`, returning the stall to sit
    /// through before the insert runs.
    fn take_fault(&mut self, collection: Collection) -> Result<Option<Duration>, StoreError> {
        match self.injected_faults.remove(&collection) {
            Some(Fault::Fail) => Err(StoreError::Unavailable(format!(
                "injected fault on insert into {}",
                collection
            ))),
            Some(Fault::Stall(delay)) => Ok(Some(delay)),
            None => Ok(None),
        }
    }

    fn remove(&mut self, collection: Collection, id: Uuid) {
        match collection {
            Collection::Customers => self.customers.retain(|c| c.customer_id != id),
            Collection::Sales => self.sales.retain(|(_, s)| s.sale_id != id),
            Collection::SaleItems => self.line_items.retain(|i| i.line_item_id != id),
            Collection::Expenses => self.expenses.retain(|e| e.expense_id != id),
        }
    }

    fn sale_exists(&self, sale_id: Uuid) -> bool {
        self.sales.iter().any(|(_, s)| s.sale_id == sale_id)
    }

    fn insert_expense(&mut self, input: &CreateExpense) -> Result<Expense, StoreError> {
        if !self.sale_exists(input.sale_id) {
            return Err(StoreError::Constraint(format!(
                "expense references missing sale {}",
                input.sale_id
            )));
        }
        let expense = Expense {
            expense_id: Uuid::new_v4(),
            sale_id: input.sale_id,
            concept: input.concept.clone(),
            amount: input.amount,
            created_utc: Utc::now(),
        };
        self.expenses.push(expense.clone());
        Ok(expense)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

fn lock(tables: &Mutex<Tables>) -> MutexGuard<'_, Tables> {
    tables.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Apply any fault armed for `collection` ahead of an insert.
async fn before_insert(tables: &Mutex<Tables>, collection: Collection) -> Result<(), StoreError> {
    let stall = lock(tables).take_fault(collection)?;
    if let Some(delay) = stall {
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next insert into `collection` fail with a retryable error.
    pub fn fail_next_insert(&self, collection: Collection) {
        lock(&self.tables)
            .injected_faults
            .insert(collection, Fault::Fail);
    }

    /// Make the next insert into `collection` wait `delay` before running.
    pub fn stall_next_insert(&self, collection: Collection, delay: Duration) {
        lock(&self.tables)
            .injected_faults
            .insert(collection, Fault::Stall(delay));
    }

    /// Make the next transaction commit apply its writes and then wait `delay`
    /// before reporting success.
    pub fn stall_next_commit(&self, delay: Duration) {
        lock(&self.tables).commit_stall = Some(delay);
    }

    /// Make the next health check wait `delay` before answering.
    pub fn stall_next_health_check(&self, delay: Duration) {
        lock(&self.tables).health_stall = Some(delay);
    }

    /// Number of rows currently held in `collection`.
    pub fn count(&self, collection: Collection) -> usize {
        let tables = lock(&self.tables);
        match collection {
            Collection::Customers => tables.customers.len(),
            Collection::Sales => tables.sales.len(),
            Collection::SaleItems => tables.line_items.len(),
            Collection::Expenses => tables.expenses.len(),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        let stall = lock(&self.tables).health_stall.take();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn insert_customer(&self, input: &NewCustomer) -> Result<Customer, StoreError> {
        before_insert(&self.tables, Collection::Customers).await?;
        let mut tables = lock(&self.tables);
        let customer = Customer {
            customer_id: Uuid::new_v4(),
            name: input.name.clone(),
            phone: input.phone.clone(),
            national_id: input.national_id.clone(),
            tax_id: input.tax_id.clone(),
            district: input.district.clone(),
            installation_service: input.installation_service,
            created_utc: Utc::now(),
        };
        tables.customers.push(customer.clone());
        Ok(customer)
    }

    async fn get_customer(&self, customer_id: Uuid) -> Result<Option<Customer>, StoreError> {
        Ok(lock(&self.tables)
            .customers
            .iter()
            .find(|c| c.customer_id == customer_id)
            .cloned())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        let mut customers = lock(&self.tables).customers.clone();
        customers.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_utc.cmp(&b.created_utc)));
        Ok(customers)
    }

    async fn get_sale(&self, sale_id: Uuid) -> Result<Option<Sale>, StoreError> {
        Ok(lock(&self.tables)
            .sales
            .iter()
            .find(|(_, s)| s.sale_id == sale_id)
            .map(|(_, s)| s.clone()))
    }

    async fn list_sales(&self) -> Result<Vec<Sale>, StoreError> {
        let mut sales = lock(&self.tables).sales.clone();
        sales.sort_by(|(seq_a, a), (seq_b, b)| {
            b.issued_utc.cmp(&a.issued_utc).then(seq_b.cmp(seq_a))
        });
        Ok(sales.into_iter().map(|(_, s)| s).collect())
    }

    async fn list_line_items(&self, sale_ids: &[Uuid]) -> Result<Vec<LineItem>, StoreError> {
        let mut items: Vec<LineItem> = lock(&self.tables)
            .line_items
            .iter()
            .filter(|i| sale_ids.contains(&i.sale_id))
            .cloned()
            .collect();
        items.sort_by_key(|i| i.sort_order);
        Ok(items)
    }

    async fn list_expenses(&self, sale_ids: &[Uuid]) -> Result<Vec<Expense>, StoreError> {
        Ok(lock(&self.tables)
            .expenses
            .iter()
            .filter(|e| sale_ids.contains(&e.sale_id))
            .cloned()
            .collect())
    }

    async fn update_sale_advance(
        &self,
        sale_id: Uuid,
        advance: Decimal,
    ) -> Result<(), StoreError> {
        let mut tables = lock(&self.tables);
        let (_, sale) = tables
            .sales
            .iter_mut()
            .find(|(_, s)| s.sale_id == sale_id)
            .ok_or(StoreError::NotFound {
                collection: Collection::Sales,
                id: sale_id,
            })?;
        sale.advance_amount = advance;
        Ok(())
    }

    async fn insert_expense(&self, input: &CreateExpense) -> Result<Expense, StoreError> {
        before_insert(&self.tables, Collection::Expenses).await?;
        lock(&self.tables).insert_expense(input)
    }

    async fn get_expense(&self, expense_id: Uuid) -> Result<Option<Expense>, StoreError> {
        Ok(lock(&self.tables)
            .expenses
            .iter()
            .find(|e| e.expense_id == expense_id)
            .cloned())
    }

    async fn delete_expense(&self, expense_id: Uuid) -> Result<(), StoreError> {
        let mut tables = lock(&self.tables);
        let before = tables.expenses.len();
        tables.remove(Collection::Expenses, expense_id);
        if tables.expenses.len() == before {
            return Err(StoreError::NotFound {
                collection: Collection::Expenses,
                id: expense_id,
            });
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            tables: Arc::clone(&self.tables),
            undo: Vec::new(),
            finished: false,
        }))
    }
}

pub struct MemoryTransaction {
    tables: Arc<Mutex<Tables>>,
    undo: Vec<(Collection, Uuid)>,
    finished: bool,
}

impl MemoryTransaction {
    fn undo_all(&mut self) {
        let mut tables = lock(&self.tables);
        for (collection, id) in self.undo.drain(..).rev() {
            tables.remove(collection, id);
        }
        self.finished = true;
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.undo_all();
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn insert_sale(&mut self, input: &CreateSale) -> Result<Sale, StoreError> {
        before_insert(&self.tables, Collection::Sales).await?;
        let mut tables = lock(&self.tables);
        if !tables.customers.iter().any(|c| c.customer_id == input.customer_id) {
            return Err(StoreError::Constraint(format!(
                "sale references missing customer {}",
                input.customer_id
            )));
        }
        let sale = Sale {
            sale_id: Uuid::new_v4(),
            customer_id: input.customer_id,
            document_type: input.document_type.as_str().to_string(),
            total_amount: input.total_amount,
            advance_amount: input.advance_amount,
            delivery_date: input.delivery_date,
            issued_utc: Utc::now(),
        };
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables.sales.push((seq, sale.clone()));
        drop(tables);

        self.undo.push((Collection::Sales, sale.sale_id));
        Ok(sale)
    }

    async fn insert_line_item(&mut self, input: &CreateLineItem) -> Result<LineItem, StoreError> {
        before_insert(&self.tables, Collection::SaleItems).await?;
        let mut tables = lock(&self.tables);
        if !tables.sale_exists(input.sale_id) {
            return Err(StoreError::Constraint(format!(
                "line item references missing sale {}",
                input.sale_id
            )));
        }
        let item = LineItem {
            line_item_id: Uuid::new_v4(),
            sale_id: input.sale_id,
            description: input.description.clone(),
            unit_price: input.unit_price,
            quantity: input.quantity,
            line_total: input.line_total,
            sort_order: input.sort_order,
            created_utc: Utc::now(),
        };
        tables.line_items.push(item.clone());
        drop(tables);

        self.undo.push((Collection::SaleItems, item.line_item_id));
        Ok(item)
    }

    async fn insert_expense(&mut self, input: &CreateExpense) -> Result<Expense, StoreError> {
        before_insert(&self.tables, Collection::Expenses).await?;
        let expense = lock(&self.tables).insert_expense(input)?;
        self.undo.push((Collection::Expenses, expense.expense_id));
        Ok(expense)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut tx = self;
        tx.undo.clear();
        tx.finished = true;

        let stall = lock(&tx.tables).commit_stall.take();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let mut tx = self;
        tx.undo_all();
        Ok(())
    }
}
