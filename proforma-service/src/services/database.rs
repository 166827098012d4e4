//! PostgreSQL record store for proforma-service.

use crate::models::{
    CreateExpense, CreateLineItem, CreateSale, Customer, Expense, LineItem, NewCustomer, Sale,
};
use crate::services::store::{Collection, RecordStore, StoreError, StoreTransaction};
use async_trait::async_trait;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const CUSTOMER_COLUMNS: &str =
    "customer_id, name, phone, national_id, tax_id, district, installation_service, created_utc";
const SALE_COLUMNS: &str =
    "sale_id, customer_id, document_type, total_amount, advance_amount, delivery_date, issued_utc";
const LINE_ITEM_COLUMNS: &str =
    "line_item_id, sale_id, description, unit_price, quantity, line_total, sort_order, created_utc";
const EXPENSE_COLUMNS: &str = "expense_id, sale_id, concept, amount, created_utc";

/// Classify a driver error as transient, constraint or other.
fn store_error(context: &str, e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Database(ref db_err)
            if db_err.is_unique_violation()
                || db_err.is_foreign_key_violation()
                || db_err.is_check_violation() =>
        {
            StoreError::Constraint(format!("{}: {}", context, db_err))
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(format!("{}: {}", context, e)),
        other => StoreError::Other(format!("{}: {}", context, other)),
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "proforma-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Health check failed", e))?;
        Ok(())
    }

    #[instrument(skip(self, input))]
    async fn insert_customer(&self, input: &NewCustomer) -> Result<Customer, StoreError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customers (customer_id, name, phone, national_id, tax_id, district, installation_service)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.national_id)
        .bind(&input.tax_id)
        .bind(&input.district)
        .bind(input.installation_service)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("Failed to create customer", e))?;

        info!(customer_id = %customer.customer_id, "Customer created");

        Ok(customer)
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    async fn get_customer(&self, customer_id: Uuid) -> Result<Option<Customer>, StoreError> {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customers WHERE customer_id = $1",
            CUSTOMER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to get customer", e))
    }

    #[instrument(skip(self))]
    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customers ORDER BY name, created_utc",
            CUSTOMER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list customers", e))
    }

    #[instrument(skip(self), fields(sale_id = %sale_id))]
    async fn get_sale(&self, sale_id: Uuid) -> Result<Option<Sale>, StoreError> {
        sqlx::query_as::<_, Sale>(&format!(
            "SELECT {} FROM sales WHERE sale_id = $1",
            SALE_COLUMNS
        ))
        .bind(sale_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to get sale", e))
    }

    #[instrument(skip(self))]
    async fn list_sales(&self) -> Result<Vec<Sale>, StoreError> {
        sqlx::query_as::<_, Sale>(&format!(
            "SELECT {} FROM sales ORDER BY issued_utc DESC, sale_id",
            SALE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list sales", e))
    }

    #[instrument(skip(self, sale_ids), fields(sale_count = sale_ids.len()))]
    async fn list_line_items(&self, sale_ids: &[Uuid]) -> Result<Vec<LineItem>, StoreError> {
        sqlx::query_as::<_, LineItem>(&format!(
            r#"
            SELECT {} FROM sale_items
            WHERE sale_id = ANY($1)
            ORDER BY sale_id, sort_order, created_utc
            "#,
            LINE_ITEM_COLUMNS
        ))
        .bind(sale_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list line items", e))
    }

    #[instrument(skip(self, sale_ids), fields(sale_count = sale_ids.len()))]
    async fn list_expenses(&self, sale_ids: &[Uuid]) -> Result<Vec<Expense>, StoreError> {
        sqlx::query_as::<_, Expense>(&format!(
            r#"
            SELECT {} FROM expenses
            WHERE sale_id = ANY($1)
            ORDER BY sale_id, created_utc
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(sale_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list expenses", e))
    }

    #[instrument(skip(self), fields(sale_id = %sale_id, advance = %advance))]
    async fn update_sale_advance(
        &self,
        sale_id: Uuid,
        advance: Decimal,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE sales SET advance_amount = $2 WHERE sale_id = $1")
            .bind(sale_id)
            .bind(advance)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to update advance", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: Collection::Sales,
                id: sale_id,
            });
        }

        info!("Sale advance updated");
        Ok(())
    }

    #[instrument(skip(self, input), fields(sale_id = %input.sale_id))]
    async fn insert_expense(&self, input: &CreateExpense) -> Result<Expense, StoreError> {
        insert_expense_row(&self.pool, input).await
    }

    #[instrument(skip(self), fields(expense_id = %expense_id))]
    async fn get_expense(&self, expense_id: Uuid) -> Result<Option<Expense>, StoreError> {
        sqlx::query_as::<_, Expense>(&format!(
            "SELECT {} FROM expenses WHERE expense_id = $1",
            EXPENSE_COLUMNS
        ))
        .bind(expense_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to get expense", e))
    }

    #[instrument(skip(self), fields(expense_id = %expense_id))]
    async fn delete_expense(&self, expense_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM expenses WHERE expense_id = $1")
            .bind(expense_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to delete expense", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: Collection::Expenses,
                id: expense_id,
            });
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to begin transaction", e))?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

async fn insert_expense_row<'e, E>(executor: E, input: &CreateExpense) -> Result<Expense, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let expense = sqlx::query_as::<_, Expense>(&format!(
        r#"
        INSERT INTO expenses (expense_id, sale_id, concept, amount)
        VALUES ($1, $2, $3, $4)
        RETURNING {}
        "#,
        EXPENSE_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(input.sale_id)
    .bind(&input.concept)
    .bind(input.amount)
    .fetch_one(executor)
    .await
    .map_err(|e| store_error("Failed to record expense", e))?;

    info!(expense_id = %expense.expense_id, amount = %expense.amount, "Expense recorded");

    Ok(expense)
}

/// An open SQL transaction. sqlx rolls it back if dropped uncommitted.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn insert_sale(&mut self, input: &CreateSale) -> Result<Sale, StoreError> {
        sqlx::query_as::<_, Sale>(&format!(
            r#"
            INSERT INTO sales (sale_id, customer_id, document_type, total_amount, advance_amount, delivery_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SALE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.customer_id)
        .bind(input.document_type.as_str())
        .bind(input.total_amount)
        .bind(input.advance_amount)
        .bind(input.delivery_date)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to create sale", e))
    }

    async fn insert_line_item(&mut self, input: &CreateLineItem) -> Result<LineItem, StoreError> {
        sqlx::query_as::<_, LineItem>(&format!(
            r#"
            INSERT INTO sale_items (line_item_id, sale_id, description, unit_price, quantity, line_total, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            LINE_ITEM_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.sale_id)
        .bind(&input.description)
        .bind(input.unit_price)
        .bind(input.quantity)
        .bind(input.line_total)
        .bind(input.sort_order)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to add line item", e))
    }

    async fn insert_expense(&mut self, input: &CreateExpense) -> Result<Expense, StoreError> {
        insert_expense_row(&mut *self.tx, input).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| store_error("Failed to commit transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| store_error("Failed to roll back transaction", e))
    }
}
