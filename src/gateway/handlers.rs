//! HTTP handlers
//!
//! - [`health`]: liveness and build info
//! - [`account`]: account creation, balance and history projections
//! - [`transaction`]: transfers and the reversal placeholder

pub mod account;
pub mod health;
pub mod transaction;

pub use account::{create_account, get_balance, get_history};
pub use health::{HealthResponse, health_check};
pub use transaction::{create_transaction, reverse_transaction};
