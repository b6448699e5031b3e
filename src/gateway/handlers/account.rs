//! Account handlers: creation, balance and history projections

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use validator::Validate;

use super::super::state::AppState;
use super::super::types::{
    AccountData, ActivityData, ApiError, ApiResult, CreateAccountRequest, HistoryQuery, created,
    ok, parse_path_id,
};

/// Open a new account with balance 0
///
/// POST /api/v1/accounts
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountData),
        (status = 400, description = "Invalid user id or currency")
    ),
    tag = "Account"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult<AccountData> {
    let Json(req) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    req.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let account = state
        .accounts
        .create_account(&req.user_id, &req.currency)
        .await?;
    created(account.into())
}

/// Current balance of one account
///
/// GET /api/v1/accounts/{id}/balance
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}/balance",
    params(
        ("id" = String, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "Balance projection", body = AccountData),
        (status = 400, description = "Malformed account id"),
        (status = 404, description = "Account not found")
    ),
    tag = "Account"
)]
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<AccountData> {
    let account_id = parse_path_id(&id).map_err(ApiError::bad_request)?;
    let account = state.accounts.balance(account_id).await?;
    ok(account.into())
}

/// Posting history of one account, newest first
///
/// GET /api/v1/transactions/{id}?limit=
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{id}",
    params(
        ("id" = String, Path, description = "Account id"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "History projection", body = Vec<ActivityData>),
        (status = 400, description = "Malformed account id"),
        (status = 404, description = "Account not found")
    ),
    tag = "Account"
)]
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<ActivityData>> {
    let account_id = parse_path_id(&id).map_err(ApiError::bad_request)?;
    let entries = state.accounts.history(account_id, query.limit).await?;
    ok(entries.into_iter().map(ActivityData::from).collect())
}
