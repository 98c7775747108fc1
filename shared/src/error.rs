//! Domain error taxonomy shared by the ledger, tracker and lifecycle rules

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by stock rules before anything is persisted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Bad input: negative quantity, missing field, malformed date
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    /// Day already ended, day-start preconditions unmet
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A deduction exceeds the ledger's current stock. Nothing was deducted.
    #[error("Insufficient stock for {item}: requested {requested}, available {available}")]
    InsufficientStock {
        item: String,
        requested: Decimal,
        available: Decimal,
    },
}

impl DomainError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        DomainError::Conflict(message.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
