pub mod customers;
pub mod drafts;
pub mod health;
pub mod sales;
