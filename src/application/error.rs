use thiserror::Error;
use tracing::error;

use crate::domain::Cents;
use crate::storage::StoreError;

/// Errors returned to callers of the ledger service.
///
/// Storage details never cross this boundary: anything the store cannot
/// classify is logged here and surfaced as an opaque `Internal`.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown player: {0}")]
    UnknownPlayer(String),

    #[error("Insufficient funds: balance {available}, required {required}")]
    InsufficientFunds { required: Cents, available: Cents },

    #[error("Page {0} not found")]
    PageNotFound(i64),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request timed out")]
    TimedOut,

    #[error("Internal error")]
    Internal,
}

impl LedgerError {
    /// Translate a store failure. `unknown` names the player reported when
    /// the store could not find an account.
    pub(crate) fn from_store(operation: &'static str, unknown: &str, err: StoreError) -> Self {
        match err {
            StoreError::Validation(message) => LedgerError::Validation(message),
            StoreError::NotFound(_) => LedgerError::UnknownPlayer(unknown.to_string()),
            StoreError::InsufficientFunds {
                required,
                available,
            } => LedgerError::InsufficientFunds {
                required,
                available,
            },
            StoreError::Cancelled => LedgerError::Cancelled,
            StoreError::TimedOut => LedgerError::TimedOut,
            StoreError::Internal(source) => {
                error!(operation, error = %format!("{source:#}"), "ledger storage failure");
                LedgerError::Internal
            }
        }
    }
}
