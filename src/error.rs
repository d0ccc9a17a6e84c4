//! Application error type and its HTTP mapping. Every error response is a
//! `{"error": ...}` JSON body; store and processor failures are logged
//! server-side and surfaced generically.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("cart is empty")]
    EmptyCart,

    #[error("checkout failed: {0}")]
    Payment(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Validation(_) | AppError::EmptyCart => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Payment(_) => {
                tracing::error!(error = %self, "payment processor call failed");
                (StatusCode::BAD_GATEWAY, "checkout failed".to_string())
            }
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "operation failed".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
