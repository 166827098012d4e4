//! The record store behind the service.
//!
//! Single-row operations live on [`RecordStore`]. The multi-row sale commit goes
//! through a [`StoreTransaction`] so header, line items and expenses land
//! together or not at all.

use crate::models::{
    CreateExpense, CreateLineItem, CreateSale, Customer, Expense, LineItem, NewCustomer, Sale,
};
use crate::services::metrics::STORE_CALL_DURATION;
use async_trait::async_trait;
use rust_decimal::Decimal;
use service_core::retry::{retry_call, RetryConfig, Retryable};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Entity collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Customers,
    Sales,
    SaleItems,
    Expenses,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Customers => "customers",
            Collection::Sales => "sales",
            Collection::SaleItems => "sale_items",
            Collection::Expenses => "expenses",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call `{operation}` timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// The call may or may not have taken effect; repeating it could apply
    /// it twice.
    #[error("outcome of `{operation}` is unknown: {cause}")]
    OutcomeUnknown {
        operation: &'static str,
        cause: String,
    },

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("{collection} record {id} not found")]
    NotFound { collection: Collection, id: Uuid },

    #[error("store failure: {0}")]
    Other(String),
}

impl Retryable for StoreError {
    /// Connectivity loss and timeouts may clear up on their own; everything else
    /// will fail the same way again.
    fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout { .. })
    }
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        Retryable::is_retryable(self)
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    async fn insert_customer(&self, input: &NewCustomer) -> Result<Customer, StoreError>;

    async fn get_customer(&self, customer_id: Uuid) -> Result<Option<Customer>, StoreError>;

    /// All customers ordered by name.
    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError>;

    async fn get_sale(&self, sale_id: Uuid) -> Result<Option<Sale>, StoreError>;

    /// All sales, newest issue date first.
    async fn list_sales(&self) -> Result<Vec<Sale>, StoreError>;

    /// Line items of the given sales in sort order.
    async fn list_line_items(&self, sale_ids: &[Uuid]) -> Result<Vec<LineItem>, StoreError>;

    /// Expenses of the given sales in creation order.
    async fn list_expenses(&self, sale_ids: &[Uuid]) -> Result<Vec<Expense>, StoreError>;

    /// Fails with [`StoreError::NotFound`] when the sale does not exist.
    async fn update_sale_advance(&self, sale_id: Uuid, advance: Decimal)
        -> Result<(), StoreError>;

    async fn insert_expense(&self, input: &CreateExpense) -> Result<Expense, StoreError>;

    async fn get_expense(&self, expense_id: Uuid) -> Result<Option<Expense>, StoreError>;

    /// Fails with [`StoreError::NotFound`] when the expense does not exist.
    async fn delete_expense(&self, expense_id: Uuid) -> Result<(), StoreError>;

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// A unit of work spanning several inserts. Dropping it without
/// [`StoreTransaction::commit`] discards every write made through it.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn insert_sale(&mut self, input: &CreateSale) -> Result<Sale, StoreError>;

    async fn insert_line_item(&mut self, input: &CreateLineItem) -> Result<LineItem, StoreError>;

    async fn insert_expense(&mut self, input: &CreateExpense) -> Result<Expense, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Run a store call with an upper bound on how long it may take, recording
/// its duration under `operation`.
pub async fn bounded<T, F>(timeout: Duration, operation: &'static str, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let timer = STORE_CALL_DURATION
        .with_label_values(&[operation])
        .start_timer();

    let result = match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            operation,
            timeout_ms: timeout.as_millis() as u64,
        }),
    };

    timer.observe_duration();
    result
}

/// A record store plus the call policy used against it: every call is
/// bounded by `timeout`, reads are retried on transient failure, writes are
/// attempted once.
#[derive(Clone)]
pub struct StoreGateway {
    store: Arc<dyn RecordStore>,
    timeout: Duration,
    read_retry: RetryConfig,
}

impl StoreGateway {
    pub fn new(store: Arc<dyn RecordStore>, timeout: Duration, read_retry: RetryConfig) -> Self {
        Self {
            store,
            timeout,
            read_retry,
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn read<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        retry_call(&self.read_retry, operation, || {
            bounded(self.timeout, operation, call())
        })
        .await
    }

    pub async fn write<T, Fut>(&self, operation: &'static str, call: Fut) -> Result<T, StoreError>
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        bounded(self.timeout, operation, call).await
    }

    /// Like [`StoreGateway::write`], for the call that makes a unit of work
    /// durable. A timeout or lost connection there leaves the outcome unknown,
    /// so it is reported as [`StoreError::OutcomeUnknown`] rather than as
    /// something to retry.
    pub async fn settle<Fut>(&self, operation: &'static str, call: Fut) -> Result<(), StoreError>
    where
        Fut: Future<Output = Result<(), StoreError>>,
    {
        self.write(operation, call).await.map_err(|e| {
            if e.is_retryable() {
                StoreError::OutcomeUnknown {
                    operation,
                    cause: e.to_string(),
                }
            } else {
                e
            }
        })
    }
}
