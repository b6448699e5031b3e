//! Ledger data model
//!
//! - [`Account`]: mutable, version-controlled balance cache
//! - [`Transaction`]: append-only transfer intent, one per idempotency key
//! - [`LedgerPosting`]: append-only leg; two per transaction, summing to zero

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core_types::{AccountId, MinorUnits, PostingId, TransactionId};

/// Account row
///
/// `balance` never goes negative and `version` moves by exactly one on every
/// successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: String,
    pub currency: String,
    pub balance: MinorUnits,
    pub version: i64,
    pub last_updated: DateTime<Utc>,
}

impl Account {
    /// Fresh account: balance 0, version 1
    pub fn open(id: AccountId, user_id: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            currency: currency.into(),
            balance: 0,
            version: 1,
            last_updated: Utc::now(),
        }
    }
}

/// Transaction status
///
/// Only `Posted` is ever persisted: a failed attempt leaves no row behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Posted,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Posted => "POSTED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POSTED" => Ok(TransactionStatus::Posted),
            other => Err(format!("unknown transaction status: {}", other)),
        }
    }
}

/// Transfer intent record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub idempotency_key: String,
    pub reference: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Posting direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "DEBIT",
            Direction::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBIT" => Ok(Direction::Debit),
            "CREDIT" => Ok(Direction::Credit),
            other => Err(format!("unknown posting direction: {}", other)),
        }
    }
}

/// One immutable leg of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPosting {
    pub id: PostingId,
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    /// Signed: negative for DEBIT, positive for CREDIT
    pub amount: MinorUnits,
    pub direction: Direction,
}

impl LedgerPosting {
    /// Debit leg: `-amount` against the sender
    pub fn debit_leg(
        id: PostingId,
        transaction_id: TransactionId,
        account_id: AccountId,
        amount: MinorUnits,
    ) -> Self {
        Self {
            id,
            transaction_id,
            account_id,
            amount: -amount,
            direction: Direction::Debit,
        }
    }

    /// Credit leg: `+amount` for the receiver
    pub fn credit_leg(
        id: PostingId,
        transaction_id: TransactionId,
        account_id: AccountId,
        amount: MinorUnits,
    ) -> Self {
        Self {
            id,
            transaction_id,
            account_id,
            amount,
            direction: Direction::Credit,
        }
    }
}

/// History entry: one posting leg joined with its transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountActivity {
    pub posting_id: PostingId,
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub amount: MinorUnits,
    pub direction: Direction,
    pub reference: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}
