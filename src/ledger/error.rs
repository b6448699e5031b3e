//! Ledger Error Types
//!
//! Every failure surfaced by the ledger falls into one of five categories
//! (see [`ErrorCategory`]). Variants are finer grained so callers and logs
//! keep the detail, while `category()` gives the stable classification.

use thiserror::Error;

use super::store::StoreError;
use crate::core_types::{AccountId, TransactionId};

/// Stable error classification exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed input, rejected before touching the store
    Validation,
    /// Idempotency key already bound to a transaction
    DuplicateRequest,
    /// Conditional debit affected zero rows
    InsufficientFundsOrConflict,
    /// Any other store failure
    Persistence,
    /// Endpoint deliberately not provided
    NotImplemented,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "VALIDATION_ERROR",
            ErrorCategory::DuplicateRequest => "DUPLICATE_REQUEST",
            ErrorCategory::InsufficientFundsOrConflict => "INSUFFICIENT_FUNDS_OR_CONFLICT",
            ErrorCategory::Persistence => "PERSISTENCE_ERROR",
            ErrorCategory::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

/// Why a conditional debit matched no row.
///
/// Only produced by the optional diagnostic read; the fast path leaves the
/// cause unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitFailureCause {
    /// Live balance is below the requested amount
    InsufficientFunds { available: i64 },
    /// Balance was sufficient when re-read: a concurrent writer got in between
    ConcurrentModification,
    /// The sender row no longer exists
    AccountMissing,
}

impl DebitFailureCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebitFailureCause::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            DebitFailureCause::ConcurrentModification => "CONCURRENT_MODIFICATION",
            DebitFailureCause::AccountMissing => "ACCOUNT_MISSING",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // === Validation Errors ===
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Source and destination accounts are the same")]
    SameAccount,

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Currency mismatch: {from_currency} -> {to_currency}")]
    CurrencyMismatch {
        from_currency: String,
        to_currency: String,
    },

    // === Idempotency Errors ===
    #[error("Duplicate request (idempotency key already processed{})", existing_suffix(.existing_transaction_id))]
    DuplicateRequest {
        existing_transaction_id: Option<TransactionId>,
    },

    // === Balance Errors ===
    #[error("Insufficient funds or concurrent modification on account {account_id}")]
    InsufficientFundsOrConflict {
        account_id: AccountId,
        cause: Option<DebitFailureCause>,
    },

    // === System Errors ===
    #[error("Serialization conflict: {0}")]
    SerializationConflict(String),

    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Deadline exceeded before commit")]
    DeadlineExceeded,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
}

fn existing_suffix(id: &Option<TransactionId>) -> String {
    match id {
        Some(id) => format!(" as transaction {}", id),
        None => String::new(),
    }
}

impl LedgerError {
    /// The five-way classification callers branch on
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::Validation(_)
            | LedgerError::InvalidAmount
            | LedgerError::SameAccount
            | LedgerError::AccountNotFound(_)
            | LedgerError::CurrencyMismatch { .. } => ErrorCategory::Validation,
            LedgerError::DuplicateRequest { .. } => ErrorCategory::DuplicateRequest,
            LedgerError::InsufficientFundsOrConflict { .. } => {
                ErrorCategory::InsufficientFundsOrConflict
            }
            LedgerError::SerializationConflict(_)
            | LedgerError::RetriesExhausted { .. }
            | LedgerError::DeadlineExceeded
            | LedgerError::Persistence(_) => ErrorCategory::Persistence,
            LedgerError::NotImplemented(_) => ErrorCategory::NotImplemented,
        }
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "INVALID_REQUEST",
            LedgerError::InvalidAmount => "INVALID_AMOUNT",
            LedgerError::SameAccount => "SAME_ACCOUNT",
            LedgerError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            LedgerError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            LedgerError::DuplicateRequest { .. } => "DUPLICATE_REQUEST",
            LedgerError::InsufficientFundsOrConflict { .. } => "INSUFFICIENT_FUNDS_OR_CONFLICT",
            LedgerError::SerializationConflict(_) => "SERIALIZATION_CONFLICT",
            LedgerError::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            LedgerError::DeadlineExceeded => "DEADLINE_EXCEEDED",
            LedgerError::Persistence(_) => "PERSISTENCE_ERROR",
            LedgerError::NotImplemented(_) => "NOT_IMPLEMENTED",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::Validation(_)
            | LedgerError::InvalidAmount
            | LedgerError::SameAccount
            | LedgerError::CurrencyMismatch { .. } => 400,
            LedgerError::AccountNotFound(_) => 404,
            LedgerError::DuplicateRequest { .. } => 409,
            LedgerError::InsufficientFundsOrConflict { .. } => 422,
            LedgerError::SerializationConflict(_)
            | LedgerError::RetriesExhausted { .. }
            | LedgerError::Persistence(_) => 500,
            LedgerError::NotImplemented(_) => 501,
            LedgerError::DeadlineExceeded => 504,
        }
    }

    /// Whether retrying the whole unit of work may help
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::SerializationConflict(_))
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            ref dup if dup.is_idempotency_violation() => LedgerError::DuplicateRequest {
                existing_transaction_id: None,
            },
            StoreError::SerializationFailure(msg) => LedgerError::SerializationConflict(msg),
            other => LedgerError::Persistence(other.to_string()),
        }
    }
}
