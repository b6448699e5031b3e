//! API response envelope, error codes and response DTOs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::ledger::{Account, AccountActivity, ErrorCategory, LedgerError};

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: payload on success, optional detail on error
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// 200 with the success envelope
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 with the success envelope
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

// ============================================================================
// Errors
// ============================================================================

/// Error rendered as `{code, category, msg, data?}` with a matching HTTP status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    /// Stable category name shared with the core error taxonomy
    pub category: &'static str,
    pub msg: String,
    pub data: Option<serde_json::Value>,
}

/// Wire shape of an error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = 4091)]
    pub code: i32,
    #[schema(example = "DUPLICATE_REQUEST")]
    pub category: String,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: i32,
        category: ErrorCategory,
        msg: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code,
            category: category.as_str(),
            msg: msg.into(),
            data: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            error_codes::INVALID_PARAMETER,
            ErrorCategory::Validation,
            msg,
        )
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match (&e, e.category()) {
            (LedgerError::AccountNotFound(_), _) => error_codes::ACCOUNT_NOT_FOUND,
            (LedgerError::DeadlineExceeded, _) => error_codes::DEADLINE_EXCEEDED,
            (_, ErrorCategory::Validation) => error_codes::INVALID_PARAMETER,
            (_, ErrorCategory::DuplicateRequest) => error_codes::DUPLICATE_REQUEST,
            (_, ErrorCategory::InsufficientFundsOrConflict) => error_codes::INSUFFICIENT_BALANCE,
            (_, ErrorCategory::NotImplemented) => error_codes::NOT_IMPLEMENTED,
            (_, ErrorCategory::Persistence) => error_codes::INTERNAL_ERROR,
        };

        let msg = match e.category() {
            ErrorCategory::Persistence if e != LedgerError::DeadlineExceeded => {
                tracing::error!(error = %e, code = e.code(), "Request failed in persistence layer");
                "Internal error".to_string()
            }
            _ => e.to_string(),
        };

        let data = match &e {
            LedgerError::DuplicateRequest {
                existing_transaction_id: Some(id),
            } => Some(serde_json::json!({ "existing_transaction_id": id.to_string() })),
            LedgerError::InsufficientFundsOrConflict {
                cause: Some(cause), ..
            } => Some(serde_json::json!({ "cause": cause.as_str() })),
            _ => None,
        };

        Self {
            status,
            code,
            category: e.category().as_str(),
            msg,
            data,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            category: self.category.to_string(),
            msg: self.msg,
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Account projection
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountData {
    #[schema(example = "7250183020175361")]
    pub account_id: String,
    #[schema(example = "u1")]
    pub user_id: String,
    #[schema(example = "USD")]
    pub currency: String,
    /// Balance in minor units
    #[schema(example = 10000)]
    pub balance: i64,
    #[schema(example = 1)]
    pub version: i64,
    pub last_updated: DateTime<Utc>,
}

impl From<Account> for AccountData {
    fn from(a: Account) -> Self {
        Self {
            account_id: a.id.to_string(),
            user_id: a.user_id,
            currency: a.currency,
            balance: a.balance,
            version: a.version,
            last_updated: a.last_updated,
        }
    }
}

/// Posted transfer
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionData {
    #[schema(example = "7250183020175362")]
    pub transaction_id: String,
    #[schema(example = "POSTED")]
    pub status: String,
}

/// One posting leg with its transaction context
#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityData {
    pub posting_id: String,
    pub transaction_id: String,
    /// Signed minor units: negative for debits
    #[schema(example = -6000)]
    pub amount: i64,
    #[schema(example = "DEBIT")]
    pub direction: String,
    #[schema(example = "rent")]
    pub reference: String,
    #[schema(example = "POSTED")]
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<AccountActivity> for ActivityData {
    fn from(a: AccountActivity) -> Self {
        Self {
            posting_id: a.posting_id.to_string(),
            transaction_id: a.transaction_id.to_string(),
            amount: a.amount,
            direction: a.direction.as_str().to_string(),
            reference: a.reference,
            status: a.status.as_str().to_string(),
            created_at: a.created_at,
        }
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;

    // Resource errors (4xxx)
    pub const ACCOUNT_NOT_FOUND: i32 = 4001;
    pub const DUPLICATE_REQUEST: i32 = 4091;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const NOT_IMPLEMENTED: i32 = 5010;
    pub const DEADLINE_EXCEEDED: i32 = 5040;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DebitFailureCause;

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(json, serde_json::json!({"code": 0, "msg": "ok", "data": 42}));
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let body = ErrorBody {
            code: 1001,
            category: ErrorCategory::Validation.as_str().to_string(),
            msg: "bad".to_string(),
            data: None,
        };
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"code": 1001, "category": "VALIDATION_ERROR", "msg": "bad"})
        );
    }

    #[test]
    fn test_error_category_names() {
        let cases = [
            (LedgerError::SameAccount, "VALIDATION_ERROR"),
            (
                LedgerError::DuplicateRequest {
                    existing_transaction_id: Some(7),
                },
                "DUPLICATE_REQUEST",
            ),
            (
                LedgerError::InsufficientFundsOrConflict {
                    account_id: 1,
                    cause: None,
                },
                "INSUFFICIENT_FUNDS_OR_CONFLICT",
            ),
            (LedgerError::DeadlineExceeded, "PERSISTENCE_ERROR"),
            (LedgerError::NotImplemented("reversal"), "NOT_IMPLEMENTED"),
        ];
        for (err, category) in cases {
            assert_eq!(ApiError::from(err).category, category);
        }
        assert_eq!(ApiError::bad_request("x").category, "VALIDATION_ERROR");
    }

    #[test]
    fn test_ledger_error_mapping() {
        let cases = [
            (LedgerError::InvalidAmount, 400, error_codes::INVALID_PARAMETER),
            (LedgerError::AccountNotFound(9), 404, error_codes::ACCOUNT_NOT_FOUND),
            (
                LedgerError::DuplicateRequest {
                    existing_transaction_id: None,
                },
                409,
                error_codes::DUPLICATE_REQUEST,
            ),
            (
                LedgerError::InsufficientFundsOrConflict {
                    account_id: 1,
                    cause: None,
                },
                422,
                error_codes::INSUFFICIENT_BALANCE,
            ),
            (
                LedgerError::NotImplemented("reversal"),
                501,
                error_codes::NOT_IMPLEMENTED,
            ),
            (
                LedgerError::Persistence("pool timed out".into()),
                500,
                error_codes::INTERNAL_ERROR,
            ),
            (LedgerError::DeadlineExceeded, 504, error_codes::DEADLINE_EXCEEDED),
        ];
        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status.as_u16(), status);
            assert_eq!(api.code, code);
        }
    }

    #[test]
    fn test_duplicate_carries_existing_id() {
        let api = ApiError::from(LedgerError::DuplicateRequest {
            existing_transaction_id: Some(42),
        });
        assert_eq!(
            api.data,
            Some(serde_json::json!({"existing_transaction_id": "42"}))
        );
    }

    #[test]
    fn test_persistence_detail_not_leaked() {
        let api = ApiError::from(LedgerError::Persistence("password=hunter2".into()));
        assert_eq!(api.msg, "Internal error");
    }

    #[test]
    fn test_diagnosed_cause_exposed() {
        let api = ApiError::from(LedgerError::InsufficientFundsOrConflict {
            account_id: 1,
            cause: Some(DebitFailureCause::InsufficientFunds { available: 5 }),
        });
        assert_eq!(api.data, Some(serde_json::json!({"cause": "INSUFFICIENT_FUNDS"})));
    }
}
