//! Persistent store contract
//!
//! The ledger never talks to a database directly. It drives a [`LedgerStore`]
//! that hands out [`UnitOfWork`]s: atomic, all-or-nothing groups of writes at a
//! chosen [`IsolationLevel`].
//!
//! # Rollback on drop
//!
//! A unit of work that is dropped without `commit()` MUST roll back. Dropping
//! the transfer future (client disconnect, deadline) therefore never leaves a
//! partial write behind.

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::models::{Account, AccountActivity, LedgerPosting, Transaction};
use crate::core_types::{AccountId, MinorUnits, TransactionId};

/// Name of the uniqueness constraint guarding `transactions.idempotency_key`
pub const IDEMPOTENCY_KEY_CONSTRAINT: &str = "uq_transactions_idempotency_key";

/// Transaction isolation level requested for a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling, as used in `SET TRANSACTION ISOLATION LEVEL ...`
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "read_committed" => Ok(IsolationLevel::ReadCommitted),
            "repeatable_read" => Ok(IsolationLevel::RepeatableRead),
            "serializable" => Ok(IsolationLevel::Serializable),
            other => Err(format!("unknown isolation level: {}", other)),
        }
    }
}

/// Store failure, classified so the ledger can react to each kind
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// Isolation conflict or deadlock reported by the store (transient)
    #[error("serialization failure: {0}")]
    SerializationFailure(String),

    /// A stored value could not be decoded into the domain model
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    /// Connectivity and everything else
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Transient failures may succeed when the whole unit of work is retried
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::SerializationFailure(_))
    }

    /// True when the idempotency-key uniqueness constraint fired
    pub fn is_idempotency_violation(&self) -> bool {
        matches!(
            self,
            StoreError::UniqueViolation { constraint } if constraint == IDEMPOTENCY_KEY_CONSTRAINT
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => {
                    return StoreError::UniqueViolation {
                        constraint: db_err.constraint().unwrap_or_default().to_string(),
                    };
                }
                // serialization_failure | deadlock_detected
                Some("40001") | Some("40P01") => {
                    return StoreError::SerializationFailure(db_err.message().to_string());
                }
                _ => {}
            }
        }
        if let sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) = &e {
            return StoreError::CorruptRow(e.to_string());
        }
        StoreError::Backend(e.to_string())
    }
}

/// Factory for units of work plus the plain reads that need no atomicity
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a unit of work at the given isolation level
    async fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// Persist a new account row
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    async fn find_transaction_by_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<Transaction>, StoreError>;

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    async fn postings_for_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<LedgerPosting>, StoreError>;

    /// Posting legs of one account joined with their transaction, newest first
    async fn account_activity(
        &self,
        account_id: AccountId,
        limit: i64,
    ) -> Result<Vec<AccountActivity>, StoreError>;
}

/// One atomic group of ledger writes
///
/// Every method runs inside the same store transaction. Nothing becomes
/// visible to other units of work until [`UnitOfWork::commit`] returns `Ok`.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_transaction_id_by_key(
        &mut self,
        idempotency_key: &str,
    ) -> Result<Option<TransactionId>, StoreError>;

    /// Lock account rows, one at a time, in the order given.
    ///
    /// Callers pass ids sorted ascending. Returns the rows that exist; missing
    /// ids are simply absent from the result.
    async fn lock_accounts(&mut self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError>;

    /// `balance -= amount, version += 1` only if `balance >= amount`.
    ///
    /// Returns rows affected (0 or 1).
    async fn debit_if_sufficient(
        &mut self,
        id: AccountId,
        amount: MinorUnits,
    ) -> Result<u64, StoreError>;

    /// `balance += amount, version += 1`, unconditionally. Returns rows affected.
    async fn credit(&mut self, id: AccountId, amount: MinorUnits) -> Result<u64, StoreError>;

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError>;

    async fn insert_posting(&mut self, posting: &LedgerPosting) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level_parse() {
        assert_eq!(
            "read_committed".parse::<IsolationLevel>(),
            Ok(IsolationLevel::ReadCommitted)
        );
        assert_eq!(
            "Repeatable Read".parse::<IsolationLevel>(),
            Ok(IsolationLevel::RepeatableRead)
        );
        assert_eq!(
            "SERIALIZABLE".parse::<IsolationLevel>(),
            Ok(IsolationLevel::Serializable)
        );
        assert!("snapshot".parse::<IsolationLevel>().is_err());
    }

    #[test]
    fn test_default_isolation_is_read_committed() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
        assert_eq!(IsolationLevel::default().as_sql(), "READ COMMITTED");
    }

    #[test]
    fn test_error_classification() {
        let dup = StoreError::UniqueViolation {
            constraint: IDEMPOTENCY_KEY_CONSTRAINT.to_string(),
        };
        assert!(dup.is_idempotency_violation());
        assert!(!dup.is_transient());

        let other = StoreError::UniqueViolation {
            constraint: "accounts_pkey".to_string(),
        };
        assert!(!other.is_idempotency_violation());

        assert!(StoreError::SerializationFailure("40001".into()).is_transient());
        assert!(!StoreError::Backend("down".into()).is_transient());
    }
}
