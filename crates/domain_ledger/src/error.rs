//! Ledger domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{CoreError, MoneyError};

use crate::store::StoreError;

/// Errors that can occur in the ledger engine
///
/// All variants describe a rejected operation; none leave partial state
/// behind. `Storage` is the only variant that signals an infrastructure
/// fault rather than a domain rule.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Missing required fields or malformed values
    #[error("Validation error: {0}")]
    Validation(String),

    /// A billable document must carry at least one line item
    #[error("Document has no line items")]
    EmptyDocument,

    /// Document number collision, after retries where applicable
    #[error("Duplicate document number: {number}")]
    DuplicateCode { number: String },

    /// Referenced document, account, or counterparty is absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Attempt to mutate a fully settled document
    #[error("Immutable document state: {0}")]
    ImmutableState(String),

    /// Attempt to delete a document with payments applied
    #[error("Document {document} has payments applied and cannot be deleted")]
    HasPayments { document: String },

    /// Payment amount would drive paid above total
    #[error("Overpayment: amount {amount} exceeds outstanding balance {balance}")]
    Overpayment { amount: Decimal, balance: Decimal },

    /// Journal entry debits and credits differ
    #[error("Unbalanced journal entry: debits={debits}, credits={credits}")]
    UnbalancedEntry { debits: Decimal, credits: Decimal },

    /// Payment must reference exactly one of invoice or bill
    #[error("Payment must reference exactly one of invoice or bill")]
    InvalidReference,

    /// Unexpected storage failure
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            StoreError::DuplicateNumber { number } => LedgerError::DuplicateCode { number },
            other => LedgerError::Storage(other),
        }
    }
}

impl From<MoneyError> for LedgerError {
    fn from(error: MoneyError) -> Self {
        LedgerError::Validation(error.to_string())
    }
}

impl From<CoreError> for LedgerError {
    fn from(error: CoreError) -> Self {
        LedgerError::Validation(error.to_string())
    }
}
