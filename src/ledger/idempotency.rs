//! Idempotency Guard
//!
//! Fast-path replay detection. The pre-check runs inside the unit of work but
//! takes no lock, so two requests with the same key can both pass it. The
//! uniqueness constraint on `transactions.idempotency_key` is what actually
//! guarantees one transaction per key; its violation is mapped to
//! [`LedgerError::DuplicateRequest`] by the orchestrator.

use tracing::debug;

use super::error::LedgerError;
use super::store::UnitOfWork;

pub struct IdempotencyGuard;

impl IdempotencyGuard {
    /// Fail with `DuplicateRequest` if the key is already bound to a transaction.
    pub async fn ensure_unused(
        uow: &mut dyn UnitOfWork,
        idempotency_key: &str,
    ) -> Result<(), LedgerError> {
        match uow.find_transaction_id_by_key(idempotency_key).await? {
            Some(existing) => {
                debug!(
                    idempotency_key = %idempotency_key,
                    transaction_id = existing,
                    "Idempotency key already processed"
                );
                Err(LedgerError::DuplicateRequest {
                    existing_transaction_id: Some(existing),
                })
            }
            None => Ok(()),
        }
    }
}
