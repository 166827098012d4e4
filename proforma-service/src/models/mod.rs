//! Persisted records for proforma-service.

mod customer;
mod expense;
mod line_item;
mod sale;

pub use customer::{Customer, NewCustomer};
pub use expense::{CreateExpense, Expense};
pub use line_item::{CreateLineItem, LineItem};
pub use sale::{CreateSale, DocumentType, Sale};
