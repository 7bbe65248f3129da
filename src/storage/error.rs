use std::fmt;

use thiserror::Error;

use crate::domain::Cents;

/// Which side of an operation referenced a missing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Player,
    Sender,
    Receiver,
}

impl Party {
    pub fn as_str(&self) -> &'static str {
        match self {
            Party::Player => "player",
            Party::Sender => "sender",
            Party::Receiver => "receiver",
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by the account store. Callers match on the variant,
/// never on the message.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Record not found: {0}")]
    NotFound(Party),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientFunds { required: Cents, available: Cents },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out")]
    TimedOut,

    #[error("Database error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation(format!("{} {}", field, message))
    }

    pub fn not_found(party: Party) -> Self {
        Self::NotFound(party)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
