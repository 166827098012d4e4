//! Services module for proforma-service.

pub mod committer;
pub mod customers;
pub mod database;
pub mod drafts;
pub mod error;
pub mod history;
pub mod memory;
pub mod metrics;
pub mod store;

pub use committer::{CommitRequest, CommittedSale, SaleCommitter};
pub use customers::CustomerDirectory;
pub use database::Database;
pub use drafts::{DraftSessions, SharedDraft};
pub use error::SalesError;
pub use history::{HistoryPage, HistoryPresenter, HistoryRevision, SaleRecord};
pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use store::{
    bounded, Collection, RecordStore, StoreError, StoreGateway, StoreTransaction,
};
