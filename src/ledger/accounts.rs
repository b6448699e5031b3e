//! Account service: creation plus read projections
//!
//! Balance and history are plain reads over the same store the orchestrator
//! writes through. They carry no locking and no invariants of their own.

use std::sync::Arc;
use tracing::info;

use super::error::LedgerError;
use super::models::{Account, AccountActivity};
use super::store::LedgerStore;
use crate::core_types::AccountId;
use crate::idgen::IdGenerator;

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 500;
/// Matches `accounts.user_id VARCHAR(64)`
pub const MAX_USER_ID_LEN: usize = 64;

/// Normalize and check an ISO-4217 style currency code (three letters)
pub fn normalize_currency(currency: &str) -> Result<String, LedgerError> {
    let code = currency.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(LedgerError::Validation(format!(
            "currency must be a 3-letter code, got '{}'",
            currency
        )));
    }
    Ok(code.to_ascii_uppercase())
}

pub struct AccountService {
    store: Arc<dyn LedgerStore>,
    id_gen: Arc<dyn IdGenerator>,
}

impl AccountService {
    pub fn new(store: Arc<dyn LedgerStore>, id_gen: Arc<dyn IdGenerator>) -> Self {
        Self { store, id_gen }
    }

    /// Persist a new account with balance 0 and version 1
    pub async fn create_account(
        &self,
        user_id: &str,
        currency: &str,
    ) -> Result<Account, LedgerError> {
        if user_id.trim().is_empty() {
            return Err(LedgerError::Validation(
                "user_id must not be empty".to_string(),
            ));
        }
        if user_id.chars().count() > MAX_USER_ID_LEN {
            return Err(LedgerError::Validation(format!(
                "user_id must be at most {} characters",
                MAX_USER_ID_LEN
            )));
        }
        let currency = normalize_currency(currency)?;

        let account = Account::open(self.id_gen.generate(), user_id, currency);
        self.store.insert_account(&account).await?;

        info!(
            account_id = account.id,
            user_id = %account.user_id,
            currency = %account.currency,
            "Account created"
        );
        Ok(account)
    }

    /// Current balance projection
    pub async fn balance(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .get_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Posting history, newest first. `limit` is clamped to 1..=500.
    pub async fn history(
        &self,
        account_id: AccountId,
        limit: Option<i64>,
    ) -> Result<Vec<AccountActivity>, LedgerError> {
        // Distinguish "no such account" from "no activity yet"
        self.balance(account_id).await?;

        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        Ok(self.store.account_activity(account_id, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idgen::SnowflakeGenerator;
    use crate::ledger::memory::InMemoryLedgerStore;

    fn service(store: &InMemoryLedgerStore) -> AccountService {
        AccountService::new(Arc::new(store.clone()), Arc::new(SnowflakeGenerator::new(1)))
    }

    #[test]
    fn test_normalize_currency() {
        assert_eq!(normalize_currency("USD").unwrap(), "USD");
        assert_eq!(normalize_currency("eur").unwrap(), "EUR");
        assert!(normalize_currency("US").is_err());
        assert!(normalize_currency("USDT").is_err());
        assert!(normalize_currency("U$D").is_err());
    }

    #[tokio::test]
    async fn test_create_account() {
        let store = InMemoryLedgerStore::new();
        let accounts = service(&store);

        let account = accounts.create_account("u1", "USD").await.unwrap();
        assert_eq!(account.balance, 0);
        assert_eq!(account.version, 1);

        let stored = accounts.balance(account.id).await.unwrap();
        assert_eq!(stored, account);
    }

    #[tokio::test]
    async fn test_create_account_validation() {
        let store = InMemoryLedgerStore::new();
        let accounts = service(&store);

        assert!(matches!(
            accounts.create_account("", "USD").await,
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            accounts.create_account("u1", "DOLLARS").await,
            Err(LedgerError::Validation(_))
        ));
        // Longer than the user_id column: rejected before reaching the store
        assert!(matches!(
            accounts.create_account(&"u".repeat(100), "USD").await,
            Err(LedgerError::Validation(_))
        ));
        assert!(store.accounts().await.is_empty());

        let at_limit = "u".repeat(MAX_USER_ID_LEN);
        assert!(accounts.create_account(&at_limit, "USD").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let store = InMemoryLedgerStore::new();
        let accounts = service(&store);

        assert_eq!(
            accounts.balance(404).await,
            Err(LedgerError::AccountNotFound(404))
        );
        assert_eq!(
            accounts.history(404, None).await,
            Err(LedgerError::AccountNotFound(404))
        );
    }
}
