//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    AccountData, ActivityData, CreateAccountRequest, ErrorBody, TransactionData,
    TransactionRequest,
};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ledger Engine API",
        version = "1.0.0",
        description = "Double-entry ledger: atomic, idempotent transfers between accounts with balance and history projections."
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::account::create_account,
        crate::gateway::handlers::account::get_balance,
        crate::gateway::handlers::account::get_history,
        crate::gateway::handlers::transaction::create_transaction,
        crate::gateway::handlers::transaction::reverse_transaction,
    ),
    components(
        schemas(
            HealthResponse,
            AccountData,
            ActivityData,
            ErrorBody,
            TransactionData,
            CreateAccountRequest,
            TransactionRequest,
        )
    ),
    tags(
        (name = "Account", description = "Account creation, balances and history"),
        (name = "Transaction", description = "Transfers between accounts"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Ledger Engine API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("Ledger Engine API"));
    }

    #[test]
    fn test_endpoints_registered() {
        let paths = ApiDoc::openapi().paths;
        for path in [
            "/api/v1/health",
            "/api/v1/accounts",
            "/api/v1/accounts/{id}/balance",
            "/api/v1/transactions",
            "/api/v1/transactions/{id}",
            "/api/v1/transactions/{id}/reverse",
        ] {
            assert!(paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
