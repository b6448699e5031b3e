//! Transfer State Definitions
//!
//! ```text
//! Validated → IdempotencyChecked → Debited → Credited
//!           → IntentRecorded → PostingsRecorded → Committed
//!
//! any state ──failure──▶ RolledBack
//! ```
//!
//! States live only in memory for the duration of one attempt. Nothing but a
//! committed transfer is ever persisted, so there is no stored FAILED state.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransferState {
    /// Input accepted, unit of work about to open
    Validated,
    /// No prior transaction for the idempotency key
    IdempotencyChecked,
    /// Sender balance decremented
    Debited,
    /// Receiver balance incremented
    Credited,
    /// Transaction row inserted (idempotency key now bound)
    IntentRecorded,
    /// Both posting legs written
    PostingsRecorded,
    /// Terminal: unit of work committed
    Committed,
    /// Terminal: unit of work rolled back, no trace left
    RolledBack,
}

impl TransferState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Committed | TransferState::RolledBack)
    }

    /// Forward transition on success. Terminal states stay put.
    pub fn next(&self) -> TransferState {
        match self {
            TransferState::Validated => TransferState::IdempotencyChecked,
            TransferState::IdempotencyChecked => TransferState::Debited,
            TransferState::Debited => TransferState::Credited,
            TransferState::Credited => TransferState::IntentRecorded,
            TransferState::IntentRecorded => TransferState::PostingsRecorded,
            TransferState::PostingsRecorded => TransferState::Committed,
            TransferState::Committed => TransferState::Committed,
            TransferState::RolledBack => TransferState::RolledBack,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Validated => "VALIDATED",
            TransferState::IdempotencyChecked => "IDEMPOTENCY_CHECKED",
            TransferState::Debited => "DEBITED",
            TransferState::Credited => "CREDITED",
            TransferState::IntentRecorded => "INTENT_RECORDED",
            TransferState::PostingsRecorded => "POSTINGS_RECORDED",
            TransferState::Committed => "COMMITTED",
            TransferState::RolledBack => "ROLLED_BACK",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
