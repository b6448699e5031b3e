use anyhow::Context;
use serde::{Deserialize, Deserializer};
use std::fs;

use crate::ledger::IsolationLevel;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL; `DATABASE_URL` takes precedence
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    /// Snowflake machine id, unique per running instance
    #[serde(default)]
    pub machine_id: u8,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Transfer engine tuning
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    /// `read_committed`, `repeatable_read` or `serializable`
    #[serde(deserialize_with = "deserialize_isolation")]
    pub isolation_level: IsolationLevel,
    /// Per-transfer deadline
    pub timeout_ms: u64,
    /// Extra attempts after a serialization conflict
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Explain failed debits (insufficient funds vs. concurrent update)
    pub diagnose_conflicts: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            isolation_level: IsolationLevel::ReadCommitted,
            timeout_ms: 5_000,
            max_retries: 3,
            retry_backoff_ms: 20,
            diagnose_conflicts: false,
        }
    }
}

fn default_db_max_connections() -> u32 {
    10
}

fn deserialize_isolation<'de, D>(deserializer: D) -> Result<IsolationLevel, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

impl AppConfig {
    /// Load `config/<env>.yaml`, then apply environment overrides
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config yaml: {}", config_path))?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.postgres_url = Some(url);
        }
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
