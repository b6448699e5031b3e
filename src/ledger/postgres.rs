//! PostgreSQL ledger store
//!
//! Each [`UnitOfWork`] wraps one `sqlx::Transaction`. sqlx rolls a transaction
//! back when it is dropped uncommitted, which gives the rollback-on-drop
//! behaviour the orchestrator relies on for cancellation.
//!
//! Row locks are taken with `SELECT ... FOR UPDATE`, one row per statement, in
//! the order the caller passes the ids.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};

use super::models::{Account, AccountActivity, Direction, LedgerPosting, Transaction, TransactionStatus};
use super::store::{IsolationLevel, LedgerStore, StoreError, UnitOfWork};
use crate::core_types::{AccountId, MinorUnits, TransactionId};

const ACCOUNT_COLUMNS: &str = "id, user_id, currency, balance, version, last_updated";

pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn set_isolation_sql(level: IsolationLevel) -> &'static str {
    match level {
        IsolationLevel::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
        IsolationLevel::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
        IsolationLevel::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
    }
}

fn row_to_account(row: &PgRow) -> Result<Account, StoreError> {
    Ok(Account {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        currency: row.try_get("currency")?,
        balance: row.try_get("balance")?,
        version: row.try_get("version")?,
        last_updated: row.try_get("last_updated")?,
    })
}

fn parse_status(row: &PgRow) -> Result<TransactionStatus, StoreError> {
    let status: String = row.try_get("status")?;
    status.parse().map_err(StoreError::CorruptRow)
}

fn parse_direction(row: &PgRow) -> Result<Direction, StoreError> {
    let direction: String = row.try_get("direction")?;
    direction.parse().map_err(StoreError::CorruptRow)
}

fn row_to_transaction(row: &PgRow) -> Result<Transaction, StoreError> {
    Ok(Transaction {
        id: row.try_get("id")?,
        idempotency_key: row.try_get("idempotency_key")?,
        reference: row.try_get("reference")?,
        status: parse_status(row)?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_posting(row: &PgRow) -> Result<LedgerPosting, StoreError> {
    Ok(LedgerPosting {
        id: row.try_get("id")?,
        transaction_id: row.try_get("transaction_id")?,
        account_id: row.try_get("account_id")?,
        amount: row.try_get("amount")?,
        direction: parse_direction(row)?,
    })
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(set_isolation_sql(isolation))
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, user_id, currency, balance, version, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.id)
        .bind(&account.user_id)
        .bind(&account.currency)
        .bind(account.balance)
        .bind(account.version)
        .bind(account.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn find_transaction_by_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, idempotency_key, reference, status, created_at
            FROM transactions
            WHERE idempotency_key = $1
            "#,
        )
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_transaction).transpose()
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, idempotency_key, reference, status, created_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_transaction).transpose()
    }

    async fn postings_for_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<LedgerPosting>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, transaction_id, account_id, amount, direction
            FROM ledger_postings
            WHERE transaction_id = $1
            ORDER BY id
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_posting).collect()
    }

    async fn account_activity(
        &self,
        account_id: AccountId,
        limit: i64,
    ) -> Result<Vec<AccountActivity>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.transaction_id, p.account_id, p.amount, p.direction,
                   t.reference, t.status, t.created_at
            FROM ledger_postings p
            JOIN transactions t ON t.id = p.transaction_id
            WHERE p.account_id = $1
            ORDER BY t.created_at DESC, p.id DESC
            LIMIT $2
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<AccountActivity, StoreError> {
                Ok(AccountActivity {
                    posting_id: row.try_get("id")?,
                    transaction_id: row.try_get("transaction_id")?,
                    account_id: row.try_get("account_id")?,
                    amount: row.try_get("amount")?,
                    direction: parse_direction(row)?,
                    reference: row.try_get("reference")?,
                    status: parse_status(row)?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}

struct PgUnitOfWork {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_transaction_id_by_key(
        &mut self,
        idempotency_key: &str,
    ) -> Result<Option<TransactionId>, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM transactions WHERE idempotency_key = $1",
        )
        .bind(idempotency_key)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn lock_accounts(&mut self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE id = $1 FOR UPDATE",
            ACCOUNT_COLUMNS
        );
        let mut locked = Vec::with_capacity(ids.len());
        for id in ids {
            let row = sqlx::query(&sql)
                .bind(*id)
                .fetch_optional(&mut *self.tx)
                .await?;
            if let Some(row) = row {
                locked.push(row_to_account(&row)?);
            }
        }
        Ok(locked)
    }

    async fn debit_if_sufficient(
        &mut self,
        id: AccountId,
        amount: MinorUnits,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance - $1, version = version + 1, last_updated = NOW()
            WHERE id = $2 AND balance >= $1
            "#,
        )
        .bind(amount)
        .bind(id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn credit(&mut self, id: AccountId, amount: MinorUnits) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance + $1, version = version + 1, last_updated = NOW()
            WHERE id = $2
            "#,
        )
        .bind(amount)
        .bind(id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, idempotency_key, reference, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(transaction.id)
        .bind(&transaction.idempotency_key)
        .bind(&transaction.reference)
        .bind(transaction.status.as_str())
        .bind(transaction.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_posting(&mut self, posting: &LedgerPosting) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_postings (id, transaction_id, account_id, amount, direction)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(posting.id)
        .bind(posting.transaction_id)
        .bind(posting.account_id)
        .bind(posting.amount)
        .bind(posting.direction.as_str())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgUnitOfWork { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let PgUnitOfWork { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
