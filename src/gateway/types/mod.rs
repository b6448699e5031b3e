//! Gateway types module
//!
//! ## Input Types
//! - [`CreateAccountRequest`], [`TransactionRequest`]: validated request bodies
//! - [`HistoryQuery`]: history pagination
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: Unified API response wrapper
//! - [`ApiError`]: error with HTTP status, rendered as [`ErrorBody`]
//!
//! ## Submodules
//! - [`request`]: Request DTOs and id parsing
//! - [`response`]: Response types and error codes

pub mod request;
pub mod response;

// Re-export commonly used types at module root
pub use request::{
    CreateAccountRequest, HistoryQuery, TransactionRequest, deserialize_id, parse_path_id,
};
pub use response::{
    AccountData, ActivityData, ApiError, ApiResponse, ApiResult, ErrorBody, TransactionData,
    created, error_codes, ok,
};
