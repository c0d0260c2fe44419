//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use folio_core::auth::{AuthError, TokenRejection};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed token")]
    MalformedToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid credentials")]
    BadCredential,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Status code and machine-readable error code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::MalformedToken => (StatusCode::BAD_REQUEST, "malformed_token"),
            AppError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired"),
            AppError::BadCredential => (StatusCode::UNAUTHORIZED, "bad_credential"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();
        let message = match &self {
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                "Internal server error".to_string()
            }
            AppError::StoreUnavailable(detail) => {
                tracing::error!(error = %detail, "store unavailable");
                "Service temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(ErrorResponse::new(error, message));
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::DuplicateIdentity => {
                AppError::Conflict("Identity already registered".into())
            }
            AuthError::UnknownIdentity => AppError::NotFound("Unknown identity".into()),
            AuthError::BadCredential => AppError::BadCredential,
            AuthError::InvalidToken(TokenRejection::Malformed) => AppError::MalformedToken,
            AuthError::InvalidToken(reason) => AppError::InvalidToken(reason.to_string()),
            AuthError::Expired => AppError::TokenExpired,
            AuthError::AuthorizationDenied => {
                AppError::Forbidden("Not permitted to modify this resource".into())
            }
            AuthError::NotFound(msg) => AppError::NotFound(msg),
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::StoreUnavailable(msg) => AppError::StoreUnavailable(msg),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
