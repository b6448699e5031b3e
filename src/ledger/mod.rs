//! Double-entry Ledger
//!
//! Moves value between two accounts as one atomic, idempotent unit of work
//! and keeps an append-only audit trail of postings.
//!
//! # Architecture
//!
//! ```text
//! TransferOrchestrator
//!   ├── IdempotencyGuard   (fast-path replay check)
//!   ├── BalanceMutator     (ordered locks, conditional debit, credit)
//!   └── PostingRecorder    (two immutable legs)
//!            │
//!            ▼
//!      LedgerStore / UnitOfWork   ── PgLedgerStore (PostgreSQL)
//!                                 └─ InMemoryLedgerStore (tests/dev)
//! ```
//!
//! # Invariants
//!
//! 1. `balance >= 0` for every account, always
//! 2. Every transaction has exactly two postings summing to zero
//! 3. At most one transaction per idempotency key
//! 4. `balance` = initial balance + sum of the account's postings
//! 5. Each successful transfer bumps sender and receiver `version` by exactly one

pub mod accounts;
pub mod balance;
pub mod error;
pub mod idempotency;
pub mod memory;
pub mod models;
pub mod orchestrator;
pub mod postgres;
pub mod posting;
pub mod state;
pub mod store;


// Re-exports for convenience
pub use accounts::AccountService;
pub use balance::BalanceMutator;
pub use error::{DebitFailureCause, ErrorCategory, LedgerError};
pub use idempotency::IdempotencyGuard;
pub use memory::InMemoryLedgerStore;
pub use models::{Account, AccountActivity, Direction, LedgerPosting, Transaction, TransactionStatus};
pub use orchestrator::{TransferCommand, TransferOrchestrator, TransferPolicy, TransferReceipt};
pub use postgres::PgLedgerStore;
pub use posting::{LegIds, PostingRecorder};
pub use state::TransferState;
pub use store::{IsolationLevel, LedgerStore, StoreError, UnitOfWork};
