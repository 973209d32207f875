use sea_orm::error::DbErr;
use sea_orm::TransactionError;
use serde::Serialize;
use thiserror::Error;

/// Error taxonomy shared by every service in the crate.
///
/// Validation and state errors surface synchronously to the caller. Queue
/// processing isolates failures per event, so a single bad event never fails
/// a whole drain.
#[derive(Debug, Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient stock: {0}")]
    Underflow(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Event error: {0}")]
    Event(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Helper mirroring `DbErr -> ServiceError` conversion for closures that
    /// cannot use `?` directly.
    pub fn db_error(err: DbErr) -> Self {
        ServiceError::Database(err)
    }

    /// True when retrying the operation may succeed without caller changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::ConcurrencyConflict(_))
    }
}

// Lets `db.transaction(...)` closures returning ServiceError propagate with `?`.
impl From<TransactionError<ServiceError>> for ServiceError {
    fn from(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(db_err) => ServiceError::Database(db_err),
            TransactionError::Transaction(service_err) => service_err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_error_unwraps_inner_service_error() {
        let inner = TransactionError::Transaction(ServiceError::Underflow("origin".into()));
        assert!(matches!(
            ServiceError::from(inner),
            ServiceError::Underflow(_)
        ));
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(ServiceError::ConcurrencyConflict("lost update".into()).is_retryable());
        assert!(!ServiceError::Validation("bad event".into()).is_retryable());
    }
}
