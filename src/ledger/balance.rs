//! Balance Mutator
//!
//! Moves value between two account rows inside a unit of work:
//!
//! 1. Lock both rows in ascending id order, whatever their debit/credit role.
//!    Concurrent A→B and B→A transfers then queue on the same first lock
//!    instead of deadlocking.
//! 2. Conditional debit: `balance >= amount` is evaluated against the live
//!    row by the update itself, so the funds check and the optimistic
//!    concurrency check are one statement. Zero rows affected is reported as
//!    [`LedgerError::InsufficientFundsOrConflict`] without telling the two
//!    apart.
//! 3. Unconditional credit.
//!
//! Each step bumps the touched row's `version` by exactly one.

use tracing::debug;

use super::error::{DebitFailureCause, LedgerError};
use super::models::Account;
use super::store::{LedgerStore, UnitOfWork};
use crate::core_types::{AccountId, MinorUnits};

pub struct BalanceMutator;

impl BalanceMutator {
    /// Deterministic lock order: ascending, duplicates removed
    pub fn lock_order(from: AccountId, to: AccountId) -> Vec<AccountId> {
        let mut ids = vec![from, to];
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Lock sender and receiver rows and check they can trade with each other.
    ///
    /// Returns `(sender, receiver)` as read under the lock.
    pub async fn lock_pair(
        uow: &mut dyn UnitOfWork,
        from: AccountId,
        to: AccountId,
    ) -> Result<(Account, Account), LedgerError> {
        let order = Self::lock_order(from, to);
        let locked = uow.lock_accounts(&order).await?;
        debug!(lock_order = ?order, locked = locked.len(), "Account rows locked");

        let find = |id: AccountId| {
            locked
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or(LedgerError::AccountNotFound(id))
        };
        let sender = find(from)?;
        let receiver = find(to)?;

        if sender.currency != receiver.currency {
            return Err(LedgerError::CurrencyMismatch {
                from_currency: sender.currency,
                to_currency: receiver.currency,
            });
        }

        Ok((sender, receiver))
    }

    /// Conditional debit of `amount` from `account_id`
    pub async fn debit(
        uow: &mut dyn UnitOfWork,
        account_id: AccountId,
        amount: MinorUnits,
    ) -> Result<(), LedgerError> {
        let rows = uow.debit_if_sufficient(account_id, amount).await?;
        if rows == 0 {
            // Insufficient funds and concurrent modification look identical here
            return Err(LedgerError::InsufficientFundsOrConflict {
                account_id,
                cause: None,
            });
        }
        Ok(())
    }

    /// Unconditional credit of `amount` to `account_id`
    pub async fn credit(
        uow: &mut dyn UnitOfWork,
        account_id: AccountId,
        amount: MinorUnits,
    ) -> Result<(), LedgerError> {
        let rows = uow.credit(account_id, amount).await?;
        if rows == 0 {
            return Err(LedgerError::AccountNotFound(account_id));
        }
        Ok(())
    }

    /// Resolve why a debit matched no row, at the cost of one extra read.
    ///
    /// The answer reflects the row as it is *now*; by the time the caller
    /// sees it another transfer may have changed the balance again.
    pub async fn diagnose(
        store: &dyn LedgerStore,
        account_id: AccountId,
        amount: MinorUnits,
    ) -> Result<DebitFailureCause, LedgerError> {
        let cause = match store.get_account(account_id).await? {
            None => DebitFailureCause::AccountMissing,
            Some(account) if account.balance < amount => DebitFailureCause::InsufficientFunds {
                available: account.balance,
            },
            Some(_) => DebitFailureCause::ConcurrentModification,
        };
        Ok(cause)
    }
}
