//! Authentication and authorization logic.
//!
//! Provides password hashing, signed token handling, the session lifecycle
//! and the ownership guard shared by `folio_api` handlers.

pub mod jwt;
pub mod ownership;
pub mod password;
pub mod session;

use thiserror::Error;

use crate::store::StoreError;

/// Why a presented token was not accepted (other than expiry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// Not a structurally valid token.
    Malformed,
    /// Signature does not verify against the signing key.
    InvalidSignature,
    /// A refresh token where an access token was expected, or the reverse.
    WrongKind,
    /// Refresh token already used or revoked.
    Revoked,
    /// Past its expiry, where the operation folds expiry into "invalid".
    Expired,
}

impl std::fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            TokenRejection::Malformed => "malformed token",
            TokenRejection::InvalidSignature => "invalid signature",
            TokenRejection::WrongKind => "wrong token kind",
            TokenRejection::Revoked => "token revoked",
            TokenRejection::Expired => "token expired",
        };
        f.write_str(reason)
    }
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Identity already registered")]
    DuplicateIdentity,

    #[error("Unknown identity")]
    UnknownIdentity,

    #[error("Invalid credentials")]
    BadCredential,

    #[error("Invalid token: {0}")]
    InvalidToken(TokenRejection),

    #[error("Token expired")]
    Expired,

    #[error("Not permitted to modify this resource")]
    AuthorizationDenied,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(_) => AuthError::DuplicateIdentity,
            StoreError::NotFound(msg) => AuthError::NotFound(msg),
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}

impl From<jwt::TokenError> for AuthError {
    fn from(e: jwt::TokenError) -> Self {
        match e {
            jwt::TokenError::Expired => AuthError::Expired,
            jwt::TokenError::InvalidSignature => {
                AuthError::InvalidToken(TokenRejection::InvalidSignature)
            }
            jwt::TokenError::Malformed => AuthError::InvalidToken(TokenRejection::Malformed),
            jwt::TokenError::WrongKind { .. } => AuthError::InvalidToken(TokenRejection::WrongKind),
            jwt::TokenError::Encode(msg) => AuthError::Internal(msg),
        }
    }
}
