//! In-memory ledger store
//!
//! Intended for tests/dev. Not optimized for performance.
//!
//! A unit of work holds the store-wide mutex from `begin` until commit or
//! rollback and edits a private copy of the tables, so units of work are fully
//! serialized and a dropped unit of work simply discards its copy. Constraint
//! checks mirror the PostgreSQL schema: primary keys, the idempotency-key
//! uniqueness constraint, foreign keys and `balance >= 0`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::models::{Account, AccountActivity, LedgerPosting, Transaction};
use super::store::{IDEMPOTENCY_KEY_CONSTRAINT, IsolationLevel, LedgerStore, StoreError, UnitOfWork};
use crate::core_types::{AccountId, MinorUnits, TransactionId};

#[derive(Debug, Default, Clone)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    transactions: BTreeMap<TransactionId, Transaction>,
    keys: HashMap<String, TransactionId>,
    postings: Vec<LedgerPosting>,
}

impl Tables {
    fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        if self.accounts.contains_key(&account.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "accounts_pkey".to_string(),
            });
        }
        if account.balance < 0 {
            return Err(StoreError::Backend(
                "check constraint accounts_balance_non_negative violated".to_string(),
            ));
        }
        self.accounts.insert(account.id, account.clone());
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with accounts (any starting balance >= 0)
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let mut tables = Tables::default();
        for account in accounts {
            tables.accounts.insert(account.id, account);
        }
        Self {
            tables: Arc::new(Mutex::new(tables)),
        }
    }

    /// All committed postings, in insertion order
    pub async fn postings(&self) -> Vec<LedgerPosting> {
        self.tables.lock().await.postings.clone()
    }

    /// All committed transactions, ordered by id
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.tables.lock().await.transactions.values().cloned().collect()
    }

    /// All accounts, ordered by id
    pub async fn accounts(&self) -> Vec<Account> {
        self.tables.lock().await.accounts.values().cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self, _isolation: IsolationLevel) -> Result<Box<dyn UnitOfWork>, StoreError> {
        // Holding the global lock is stronger than any requested level
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, working }))
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        self.tables.lock().await.insert_account(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.tables.lock().await.accounts.get(&id).cloned())
    }

    async fn find_transaction_by_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .keys
            .get(idempotency_key)
            .and_then(|id| tables.transactions.get(id))
            .cloned())
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.tables.lock().await.transactions.get(&id).cloned())
    }

    async fn postings_for_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<LedgerPosting>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .postings
            .iter()
            .filter(|p| p.transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn account_activity(
        &self,
        account_id: AccountId,
        limit: i64,
    ) -> Result<Vec<AccountActivity>, StoreError> {
        let tables = self.tables.lock().await;
        let mut activity: Vec<AccountActivity> = tables
            .postings
            .iter()
            .filter(|p| p.account_id == account_id)
            .filter_map(|p| {
                let txn = tables.transactions.get(&p.transaction_id)?;
                Some(AccountActivity {
                    posting_id: p.id,
                    transaction_id: p.transaction_id,
                    account_id: p.account_id,
                    amount: p.amount,
                    direction: p.direction,
                    reference: txn.reference.clone(),
                    status: txn.status,
                    created_at: txn.created_at,
                })
            })
            .collect();

        // Newest first; posting id breaks ties
        activity.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.posting_id.cmp(&a.posting_id))
        });
        activity.truncate(limit.max(0) as usize);
        Ok(activity)
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn find_transaction_id_by_key(
        &mut self,
        idempotency_key: &str,
    ) -> Result<Option<TransactionId>, StoreError> {
        Ok(self.working.keys.get(idempotency_key).copied())
    }

    async fn lock_accounts(&mut self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.accounts.get(id).cloned())
            .collect())
    }

    async fn debit_if_sufficient(
        &mut self,
        id: AccountId,
        amount: MinorUnits,
    ) -> Result<u64, StoreError> {
        match self.working.accounts.get_mut(&id) {
            Some(account) if account.balance >= amount => {
                account.balance -= amount;
                account.version += 1;
                account.last_updated = Utc::now();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn credit(&mut self, id: AccountId, amount: MinorUnits) -> Result<u64, StoreError> {
        match self.working.accounts.get_mut(&id) {
            Some(account) => {
                account.balance = account
                    .balance
                    .checked_add(amount)
                    .ok_or_else(|| StoreError::Backend("bigint out of range".to_string()))?;
                account.version += 1;
                account.last_updated = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        if self.working.keys.contains_key(&transaction.idempotency_key) {
            return Err(StoreError::UniqueViolation {
                constraint: IDEMPOTENCY_KEY_CONSTRAINT.to_string(),
            });
        }
        if self.working.transactions.contains_key(&transaction.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "transactions_pkey".to_string(),
            });
        }
        self.working
            .keys
            .insert(transaction.idempotency_key.clone(), transaction.id);
        self.working
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn insert_posting(&mut self, posting: &LedgerPosting) -> Result<(), StoreError> {
        if self.working.postings.iter().any(|p| p.id == posting.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "ledger_postings_pkey".to_string(),
            });
        }
        if !self.working.transactions.contains_key(&posting.transaction_id) {
            return Err(StoreError::Backend(format!(
                "foreign key violation: transaction {} does not exist",
                posting.transaction_id
            )));
        }
        if !self.working.accounts.contains_key(&posting.account_id) {
            return Err(StoreError::Backend(format!(
                "foreign key violation: account {} does not exist",
                posting.account_id
            )));
        }
        self.working.postings.push(posting.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        // Dropping the working copy is the rollback
        Ok(())
    }
}
