use std::sync::Arc;

use ledger_engine::config::AppConfig;
use ledger_engine::db::Database;
use ledger_engine::gateway::{run_server, state::AppState};
use ledger_engine::{
    AccountService, IdGenerator, InMemoryLedgerStore, LedgerStore, PgLedgerStore,
    SnowflakeGenerator, TransferOrchestrator, TransferPolicy,
};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = ledger_engine::logging::init_logging(&app_config);

    tracing::info!(
        env = %env,
        version = env!("GIT_HASH"),
        "Starting Ledger Engine"
    );

    let (store, db): (Arc<dyn LedgerStore>, Option<Arc<Database>>) =
        match app_config.postgres_url.as_deref() {
            Some(url) => {
                let db = Database::connect(url, app_config.db_max_connections).await?;
                db.init_schema().await?;
                tracing::info!("PostgreSQL connected and schema initialized");
                let store = PgLedgerStore::new(db.pool().clone());
                (Arc::new(store), Some(Arc::new(db)))
            }
            None => {
                tracing::warn!("No postgres_url configured, using in-memory store (data is not persisted)");
                (Arc::new(InMemoryLedgerStore::new()), None)
            }
        };

    let id_gen: Arc<dyn IdGenerator> = Arc::new(SnowflakeGenerator::new(app_config.machine_id));
    let policy = TransferPolicy::from(&app_config.ledger);
    tracing::info!(
        isolation = %policy.isolation,
        timeout_ms = policy.timeout.as_millis() as u64,
        max_retries = policy.max_retries,
        "Transfer policy"
    );

    let orchestrator = Arc::new(TransferOrchestrator::with_policy(
        store.clone(),
        id_gen.clone(),
        policy,
    ));
    let accounts = Arc::new(AccountService::new(store, id_gen));
    let state = Arc::new(AppState::new(orchestrator, accounts, db));

    let port = get_port_override().unwrap_or(app_config.gateway.port);
    run_server(&app_config.gateway.host, port, state).await
}
