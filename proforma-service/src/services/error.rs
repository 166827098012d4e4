use crate::domain::ValidationErrors;
use crate::services::store::StoreError;
use service_core::error::AppError;
use thiserror::Error;

/// Failure of a sales operation: either the input was refused before any
/// write, or the store failed underneath it.
#[derive(Debug, Error)]
pub enum SalesError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SalesError {
    /// Label used on the commit failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            SalesError::Validation(_) => "validation",
            SalesError::Store(StoreError::OutcomeUnknown { .. }) => "store_outcome_unknown",
            SalesError::Store(e) if e.is_retryable() => "store_retryable",
            SalesError::Store(_) => "store_fatal",
        }
    }
}

impl From<crate::domain::ValidationError> for SalesError {
    fn from(err: crate::domain::ValidationError) -> Self {
        SalesError::Validation(err.into())
    }
}

/// Seconds a client should wait before retrying a transient store failure.
const RETRY_AFTER_SECS: u64 = 1;

impl From<SalesError> for AppError {
    fn from(err: SalesError) -> Self {
        match err {
            SalesError::Validation(errors) => AppError::InvalidInput(errors.messages()),
            SalesError::Store(e) if e.is_retryable() => {
                AppError::ServiceUnavailable(e.to_string(), Some(RETRY_AFTER_SECS))
            }
            SalesError::Store(e) => AppError::DatabaseError(anyhow::Error::new(e)),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        SalesError::Validation(err).into()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        SalesError::Store(err).into()
    }
}
