//! Ledger Engine - double-entry transfers between accounts
//!
//! Every transfer is atomic (balances, transaction and both postings commit
//! together), idempotent (keyed by a client-supplied idempotency key) and
//! zero-sum (debit leg + credit leg = 0).
//!
//! # Modules
//!
//! - [`core_types`] - Identifier and amount aliases
//! - [`idgen`] - Snowflake id generation
//! - [`ledger`] - Transfer engine: guard, mutator, recorder, orchestrator, stores
//! - [`db`] - PostgreSQL pool and schema bootstrap
//! - [`gateway`] - HTTP API (axum)
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

// Core types - must be first!
pub mod core_types;

pub mod idgen;
pub mod ledger;

// Service plumbing
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;

// Convenient re-exports at crate root
pub use core_types::{AccountId, MinorUnits, PostingId, TransactionId};
pub use idgen::{IdGenerator, SnowflakeGenerator};
pub use ledger::{
    AccountService, InMemoryLedgerStore, LedgerError, LedgerStore, PgLedgerStore,
    TransferCommand, TransferOrchestrator, TransferPolicy,
};
