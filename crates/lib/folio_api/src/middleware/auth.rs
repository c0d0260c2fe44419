//! Authentication middleware: Bearer token extraction and access-token verification.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::error::AppError;

/// Verified caller, stored in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Subject (user id) of the access token.
    pub subject: String,
    /// The raw access token, for operations that re-present it to the core.
    pub token: String,
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidToken("Missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::InvalidToken("Invalid authorization scheme".into()))?
        .trim();
    if token.is_empty() {
        return Err(AppError::MalformedToken);
    }
    Ok(token)
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies the
/// access token, and injects `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?.to_string();
    let subject = state.sessions.validate_access(&token)?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { subject, token });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn rejects_missing_or_foreign_scheme() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AppError::InvalidToken(_))
        ));
        assert!(matches!(
            bearer_token(&headers("Basic dXNlcjpwdw==")),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn empty_bearer_is_malformed() {
        assert!(matches!(
            bearer_token(&headers("Bearer ")),
            Err(AppError::MalformedToken)
        ));
    }
}
