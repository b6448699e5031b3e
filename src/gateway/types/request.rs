//! Request DTOs
//!
//! Shape checks live here as `validator` rules; business rules (currency
//! format, same-account, funds) are enforced by the ledger itself.

use serde::{Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::core_types::{AccountId, MinorUnits};
use crate::ledger::TransferCommand;

/// Accepts an id as a JSON number or a decimal string.
///
/// Snowflake ids exceed the 2^53 range JavaScript clients can hold as numbers,
/// so responses render ids as strings and requests accept both.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Number(i64),
        Text(String),
    }

    match IdRepr::deserialize(deserializer)? {
        IdRepr::Number(id) => Ok(id),
        IdRepr::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid id: {}", s))),
    }
}

/// Parse an id taken from a URL path segment
pub fn parse_path_id(raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("invalid id: {}", raw))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 64))]
    #[schema(example = "u1")]
    pub user_id: String,
    /// Three-letter currency code
    #[validate(length(equal = 3))]
    #[schema(example = "USD")]
    pub currency: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransactionRequest {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "k1")]
    pub idempotency_key: String,
    #[serde(deserialize_with = "deserialize_id")]
    #[schema(value_type = String, example = "1001")]
    pub from_account_id: AccountId,
    #[serde(deserialize_with = "deserialize_id")]
    #[schema(value_type = String, example = "1002")]
    pub to_account_id: AccountId,
    /// Minor units, strictly positive
    #[validate(range(min = 1))]
    #[schema(example = 6000)]
    pub amount: MinorUnits,
    #[serde(default)]
    #[validate(length(max = 255))]
    #[schema(example = "rent")]
    pub reference: String,
}

impl From<TransactionRequest> for TransferCommand {
    fn from(req: TransactionRequest) -> Self {
        TransferCommand::new(
            req.idempotency_key,
            req.from_account_id,
            req.to_account_id,
            req.amount,
            req.reference,
        )
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Maximum entries, 1..=500 (default 50)
    pub limit: Option<i64>,
}
