//! Transaction handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use validator::Validate;

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, ErrorBody, TransactionData, TransactionRequest, ok, parse_path_id,
};
use crate::ledger::{LedgerError, TransactionStatus};

/// Post a transfer between two accounts
///
/// POST /api/v1/transactions
///
/// Replaying an idempotency key answers 409 with the original transaction id.
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = TransactionRequest,
    responses(
        (status = 200, description = "Transfer posted", body = TransactionData),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Account not found"),
        (status = 409, description = "Idempotency key already processed", body = ErrorBody),
        (status = 422, description = "Insufficient funds or concurrent modification", body = ErrorBody),
        (status = 500, description = "Persistence failure"),
        (status = 504, description = "Deadline exceeded")
    ),
    tag = "Transaction"
)]
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> ApiResult<TransactionData> {
    let Json(req) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    req.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let transaction_id = state.orchestrator.transfer(req.into()).await?;
    ok(TransactionData {
        transaction_id: transaction_id.to_string(),
        status: TransactionStatus::Posted.as_str().to_string(),
    })
}

/// Reverse a posted transaction (not supported)
///
/// POST /api/v1/transactions/{id}/reverse
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/reverse",
    params(
        ("id" = String, Path, description = "Transaction id")
    ),
    responses(
        (status = 501, description = "Reversal is not implemented")
    ),
    tag = "Transaction"
)]
pub async fn reverse_transaction(
    Path(id): Path<String>,
) -> ApiResult<TransactionData> {
    let transaction_id = parse_path_id(&id).map_err(ApiError::bad_request)?;
    tracing::info!(transaction_id, "Reversal requested");
    Err(LedgerError::NotImplemented("transaction reversal").into())
}
