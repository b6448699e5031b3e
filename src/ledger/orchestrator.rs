//! Transfer Orchestrator
//!
//! Runs one transfer as a single unit of work:
//!
//! ```text
//! validate ─▶ begin ─▶ idempotency check ─▶ lock (ascending ids) ─▶ debit
//!          ─▶ credit ─▶ insert transaction ─▶ insert 2 postings ─▶ commit
//! ```
//!
//! Any failure rolls the whole unit of work back; there is no compensation
//! logic and no persisted failure state.
//!
//! # Safety Invariants
//!
//! 1. **Single Unit of Work**: balances, transaction and postings commit together or not at all
//! 2. **Constraint Is Authoritative**: the idempotency pre-check is a fast path only;
//!    a uniqueness violation on insert is reported as `DuplicateRequest`
//! 3. **Bounded Retry**: only serialization conflicts are retried, never past the deadline
//! 4. **Cancellation Rolls Back**: dropping the returned future drops the open
//!    unit of work, which the store rolls back

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use super::balance::BalanceMutator;
use super::error::LedgerError;
use super::idempotency::IdempotencyGuard;
use super::models::{LedgerPosting, Transaction, TransactionStatus};
use super::posting::{LegIds, PostingRecorder};
use super::state::TransferState;
use super::store::{IsolationLevel, LedgerStore, UnitOfWork};
use crate::config::LedgerConfig;
use crate::core_types::{AccountId, MinorUnits, TransactionId};
use crate::idgen::IdGenerator;

/// Upper bound for a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(1);
/// Matches `transactions.idempotency_key VARCHAR(255)`
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// One transfer request, as accepted by the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub idempotency_key: String,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: MinorUnits,
    pub reference: String,
}

impl TransferCommand {
    pub fn new(
        idempotency_key: impl Into<String>,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: MinorUnits,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            idempotency_key: idempotency_key.into(),
            from_account_id,
            to_account_id,
            amount,
            reference: reference.into(),
        }
    }

    /// Input checks that need no store access
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.idempotency_key.trim().is_empty() {
            return Err(LedgerError::Validation(
                "idempotency_key must not be empty".to_string(),
            ));
        }
        if self.idempotency_key.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(LedgerError::Validation(format!(
                "idempotency_key must be at most {} characters",
                MAX_IDEMPOTENCY_KEY_LEN
            )));
        }
        if self.amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if self.from_account_id == self.to_account_id {
            return Err(LedgerError::SameAccount);
        }
        Ok(())
    }
}

/// How transfers run: isolation, deadline and retry behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPolicy {
    pub isolation: IsolationLevel,
    /// Default deadline when the caller supplies none
    pub timeout: Duration,
    /// Extra attempts after a serialization conflict
    pub max_retries: u32,
    /// Base delay; doubles per attempt
    pub retry_backoff: Duration,
    /// Spend one extra read to explain a failed debit
    pub diagnose_conflicts: bool,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            isolation: IsolationLevel::ReadCommitted,
            timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_backoff: Duration::from_millis(20),
            diagnose_conflicts: false,
        }
    }
}

impl From<&LedgerConfig> for TransferPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            isolation: config.isolation_level,
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            diagnose_conflicts: config.diagnose_conflicts,
        }
    }
}

/// Result of a committed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub transaction: Transaction,
    pub postings: [LedgerPosting; 2],
    /// Number of units of work opened, including the successful one
    pub attempts: u32,
}

/// Ids reserved once per transfer and reused across retries
#[derive(Debug, Clone, Copy)]
struct PlannedIds {
    transaction: TransactionId,
    legs: LegIds,
}

pub struct TransferOrchestrator {
    store: Arc<dyn LedgerStore>,
    id_gen: Arc<dyn IdGenerator>,
    policy: TransferPolicy,
}

impl TransferOrchestrator {
    pub fn new(store: Arc<dyn LedgerStore>, id_gen: Arc<dyn IdGenerator>) -> Self {
        Self::with_policy(store, id_gen, TransferPolicy::default())
    }

    pub fn with_policy(
        store: Arc<dyn LedgerStore>,
        id_gen: Arc<dyn IdGenerator>,
        policy: TransferPolicy,
    ) -> Self {
        Self {
            store,
            id_gen,
            policy,
        }
    }

    pub fn policy(&self) -> &TransferPolicy {
        &self.policy
    }

    /// Post a transfer using the policy's default deadline
    pub async fn transfer(&self, cmd: TransferCommand) -> Result<TransactionId, LedgerError> {
        let deadline = Instant::now() + self.policy.timeout;
        self.transfer_with_deadline(cmd, deadline).await
    }

    /// Post a transfer that must commit before `deadline`
    pub async fn transfer_with_deadline(
        &self,
        cmd: TransferCommand,
        deadline: Instant,
    ) -> Result<TransactionId, LedgerError> {
        self.post(cmd, deadline).await.map(|r| r.transaction.id)
    }

    /// Post a transfer and return everything it wrote
    pub async fn post(
        &self,
        cmd: TransferCommand,
        deadline: Instant,
    ) -> Result<TransferReceipt, LedgerError> {
        if let Err(e) = cmd.validate() {
            debug!(idempotency_key = %cmd.idempotency_key, error = %e, "Transfer rejected");
            return Err(e);
        }

        let ids = PlannedIds {
            transaction: self.id_gen.generate(),
            legs: LegIds {
                debit: self.id_gen.generate(),
                credit: self.id_gen.generate(),
            },
        };

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.attempt(&cmd, ids, deadline).await {
                Ok((transaction, postings)) => {
                    info!(
                        transaction_id = transaction.id,
                        idempotency_key = %cmd.idempotency_key,
                        from = cmd.from_account_id,
                        to = cmd.to_account_id,
                        amount = cmd.amount,
                        attempts,
                        "Transfer posted"
                    );
                    return Ok(TransferReceipt {
                        transaction,
                        postings,
                        attempts,
                    });
                }
                Err(e) if e.is_transient() => {
                    if attempts > self.policy.max_retries {
                        warn!(
                            idempotency_key = %cmd.idempotency_key,
                            attempts,
                            error = %e,
                            "Transfer retries exhausted"
                        );
                        return Err(LedgerError::RetriesExhausted {
                            attempts,
                            last_error: e.to_string(),
                        });
                    }
                    let delay = self.backoff(attempts);
                    if Instant::now() + delay >= deadline {
                        return Err(LedgerError::DeadlineExceeded);
                    }
                    warn!(
                        idempotency_key = %cmd.idempotency_key,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Serialization conflict, retrying transfer"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(self.resolve_failure(&cmd, e).await),
            }
        }
    }

    /// Exponential backoff with jitter, capped at [`MAX_BACKOFF`]
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.policy.retry_backoff.as_millis() as u64;
        let exp = base.saturating_mul(1u64 << (attempt.saturating_sub(1)).min(16));
        let jitter = if base > 1 {
            rand::thread_rng().gen_range(0..=base / 2)
        } else {
            0
        };
        Duration::from_millis(exp.saturating_add(jitter)).min(MAX_BACKOFF)
    }

    /// One unit of work: begin, apply, then commit or roll back
    async fn attempt(
        &self,
        cmd: &TransferCommand,
        ids: PlannedIds,
        deadline: Instant,
    ) -> Result<(Transaction, [LedgerPosting; 2]), LedgerError> {
        let mut uow = timeout_at(deadline, self.store.begin(self.policy.isolation))
            .await
            .map_err(|_| LedgerError::DeadlineExceeded)??;

        let mut state = TransferState::Validated;
        let outcome = timeout_at(deadline, Self::apply(uow.as_mut(), cmd, ids, &mut state)).await;

        match outcome {
            Ok(Ok(written)) => {
                // Not raced against the deadline: once issued, the outcome must be known
                uow.commit().await?;
                debug!(
                    transaction_id = ids.transaction,
                    state = %state.next(),
                    "Unit of work committed"
                );
                Ok(written)
            }
            Ok(Err(e)) => {
                Self::roll_back(uow, state, &e).await;
                Err(e)
            }
            Err(_) => {
                let e = LedgerError::DeadlineExceeded;
                Self::roll_back(uow, state, &e).await;
                Err(e)
            }
        }
    }

    async fn apply(
        uow: &mut dyn UnitOfWork,
        cmd: &TransferCommand,
        ids: PlannedIds,
        state: &mut TransferState,
    ) -> Result<(Transaction, [LedgerPosting; 2]), LedgerError> {
        IdempotencyGuard::ensure_unused(uow, &cmd.idempotency_key).await?;
        *state = state.next();

        BalanceMutator::lock_pair(uow, cmd.from_account_id, cmd.to_account_id).await?;
        BalanceMutator::debit(uow, cmd.from_account_id, cmd.amount).await?;
        *state = state.next();

        BalanceMutator::credit(uow, cmd.to_account_id, cmd.amount).await?;
        *state = state.next();

        let transaction = Transaction {
            id: ids.transaction,
            idempotency_key: cmd.idempotency_key.clone(),
            reference: cmd.reference.clone(),
            status: TransactionStatus::Posted,
            created_at: chrono::Utc::now(),
        };
        uow.insert_transaction(&transaction).await?;
        *state = state.next();

        let postings = PostingRecorder::record(
            uow,
            ids.legs,
            transaction.id,
            cmd.from_account_id,
            cmd.to_account_id,
            cmd.amount,
        )
        .await?;
        *state = state.next();

        Ok((transaction, postings))
    }

    async fn roll_back(uow: Box<dyn UnitOfWork>, reached: TransferState, cause: &LedgerError) {
        if let Err(e) = uow.rollback().await {
            // The store still discards the unit of work when the connection drops
            warn!(error = %e, "Rollback failed");
        }
        debug!(
            failed_after = %reached,
            state = %TransferState::RolledBack,
            error = %cause,
            "Unit of work rolled back"
        );
    }

    /// Enrich a final error with what can be learned outside the failed unit of work
    async fn resolve_failure(&self, cmd: &TransferCommand, err: LedgerError) -> LedgerError {
        match err {
            LedgerError::DuplicateRequest {
                existing_transaction_id: None,
            } => {
                // Lost the insert race: the winner has committed by now
                let existing = match self.store.find_transaction_by_key(&cmd.idempotency_key).await
                {
                    Ok(found) => found.map(|t| t.id),
                    Err(e) => {
                        warn!(error = %e, "Could not look up winning transaction");
                        None
                    }
                };
                info!(
                    idempotency_key = %cmd.idempotency_key,
                    existing_transaction_id = ?existing,
                    "Duplicate request rejected by uniqueness constraint"
                );
                LedgerError::DuplicateRequest {
                    existing_transaction_id: existing,
                }
            }
            LedgerError::InsufficientFundsOrConflict {
                account_id,
                cause: None,
            } if self.policy.diagnose_conflicts => {
                let cause =
                    match BalanceMutator::diagnose(self.store.as_ref(), account_id, cmd.amount).await
                    {
                        Ok(cause) => Some(cause),
                        Err(e) => {
                            warn!(error = %e, "Debit failure diagnosis failed");
                            None
                        }
                    };
                LedgerError::InsufficientFundsOrConflict { account_id, cause }
            }
            other => other,
        }
    }
}
