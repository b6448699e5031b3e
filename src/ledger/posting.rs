//! Posting Recorder
//!
//! Writes the two immutable legs of a transfer. There is no update or delete
//! path for postings anywhere in the crate: they are the append-only source of
//! truth that account balances cache.

use super::error::LedgerError;
use super::models::LedgerPosting;
use super::store::UnitOfWork;
use crate::core_types::{AccountId, MinorUnits, PostingId, TransactionId};

/// Ids pre-allocated for the two legs of one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegIds {
    pub debit: PostingId,
    pub credit: PostingId,
}

pub struct PostingRecorder;

impl PostingRecorder {
    /// Build the debit/credit pair. Zero-sum by construction.
    pub fn legs(
        ids: LegIds,
        transaction_id: TransactionId,
        from: AccountId,
        to: AccountId,
        amount: MinorUnits,
    ) -> [LedgerPosting; 2] {
        [
            LedgerPosting::debit_leg(ids.debit, transaction_id, from, amount),
            LedgerPosting::credit_leg(ids.credit, transaction_id, to, amount),
        ]
    }

    /// Persist exactly two postings for `transaction_id`
    pub async fn record(
        uow: &mut dyn UnitOfWork,
        ids: LegIds,
        transaction_id: TransactionId,
        from: AccountId,
        to: AccountId,
        amount: MinorUnits,
    ) -> Result<[LedgerPosting; 2], LedgerError> {
        let legs = Self::legs(ids, transaction_id, from, to, amount);
        for leg in &legs {
            uow.insert_posting(leg).await?;
        }
        Ok(legs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::models::Direction;

    #[test]
    fn test_legs_shape() {
        let [debit, credit] = PostingRecorder::legs(
            LegIds {
                debit: 11,
                credit: 12,
            },
            7,
            100,
            200,
            60,
        );

        assert_eq!(
            (debit.id, debit.transaction_id, debit.account_id, debit.amount),
            (11, 7, 100, -60)
        );
        assert_eq!(debit.direction, Direction::Debit);
        assert_eq!(
            (credit.id, credit.transaction_id, credit.account_id, credit.amount),
            (12, 7, 200, 60)
        );
        assert_eq!(credit.direction, Direction::Credit);
        assert_eq!(debit.amount + credit.amount, 0);
    }
}
