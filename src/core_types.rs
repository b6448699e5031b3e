//! Core types used throughout the system
//!
//! These are fundamental type aliases used by all modules.
//! All identifiers are 64-bit values handed out by an [`crate::idgen::IdGenerator`],
//! stored as `BIGINT` in PostgreSQL.

/// Account ID - globally unique, immutable after assignment.
///
/// # Usage:
/// - Primary key of the `accounts` table
/// - Lock ordering key: row locks are always taken in ascending `AccountId` order
pub type AccountId = i64;

/// Transaction ID - one per posted transfer
pub type TransactionId = i64;

/// Posting ID - one per ledger leg
pub type PostingId = i64;

/// Amount in minor currency units (cents for USD).
///
/// Transfer amounts are strictly positive; posting amounts carry a sign.
pub type MinorUnits = i64;
