//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! shapes in `folio_api::models`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored user record.
///
/// `password_hash` is always a bcrypt digest, never the plaintext.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub password_hash: String,
    pub name: String,
    pub api_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Publicly visible part of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub has_api_key: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            has_api_key: user.api_key.is_some(),
        }
    }
}

/// Partial profile update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub password: Option<String>,
    /// An empty string clears the stored key.
    pub api_key: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.password.is_none() && self.api_key.is_none()
    }
}

/// Field-level write applied to a stored user in one step. `None` leaves a
/// field untouched, so concurrent saves of disjoint fields do not clobber
/// each other.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub password_hash: Option<String>,
    /// `Some(None)` clears the stored key.
    pub api_key: Option<Option<String>>,
}

/// Discriminates the two token kinds so one can never stand in for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: user ID (standard JWT `sub` claim).
    pub sub: String,
    /// Token kind.
    pub typ: TokenKind,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Unique token id; refresh-token records are keyed by it.
    pub jti: String,
}

/// Freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub access_expires_in: i64,
    /// Refresh token lifetime in seconds (cookie `Max-Age`).
    pub refresh_expires_in: i64,
}

/// Server-side record of an issued refresh token.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TokenKind::Refresh).unwrap(),
            "\"refresh\""
        );
    }

    #[test]
    fn explicit_null_reads_as_unchanged() {
        let update: ProfileUpdate =
            serde_json::from_str(r#"{"name": null, "password": "pw"}"#).unwrap();
        assert!(update.name.is_none());
        assert_eq!(update.password.as_deref(), Some("pw"));
        assert!(!update.is_empty());
    }
}
