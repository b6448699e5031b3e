use std::sync::Arc;

use crate::db::Database;
use crate::ledger::{AccountService, TransferOrchestrator};

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    /// Write path: transfers
    pub orchestrator: Arc<TransferOrchestrator>,
    /// Account creation and read projections
    pub accounts: Arc<AccountService>,
    /// PostgreSQL pool, pinged by the health check (absent with the in-memory store)
    pub db: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<TransferOrchestrator>,
        accounts: Arc<AccountService>,
        db: Option<Arc<Database>>,
    ) -> Self {
        Self {
            orchestrator,
            accounts,
            db,
        }
    }
}
