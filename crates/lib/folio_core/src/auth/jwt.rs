//! JWT token generation and verification.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::ids::token_id;
use crate::models::auth::{TokenClaims, TokenKind};

/// Token decoding and signing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token signature does not verify")]
    InvalidSignature,

    #[error("token is malformed")]
    Malformed,

    #[error("expected {expected} token, got {actual}")]
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },

    #[error("jwt encode: {0}")]
    Encode(String),
}

/// A verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub subject: String,
    pub kind: TokenKind,
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies HS256 tokens with one immutable key.
///
/// Built once from configuration and shared; holds no mutable state, so
/// issuing and decoding are safe from any number of tasks.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a signed token for `subject` that expires `ttl` from now.
    pub fn issue(
        &self,
        subject: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| TokenError::Encode(e.to_string()))?;
        self.issue_at(subject, kind, Utc::now(), ttl)
            .map(|(token, _)| token)
    }

    /// Issue a token with an explicit issue time, returning it with its claims.
    ///
    /// A negative `ttl` yields an already-expired token. An expiry beyond the
    /// representable date range is a [`TokenError::Encode`] error.
    pub fn issue_at(
        &self,
        subject: &str,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<(String, TokenClaims), TokenError> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Encode(format!("token lifetime {ttl} out of range")))?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            typ: kind,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: token_id().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))?;
        Ok((token, claims))
    }

    /// Verify signature and expiry, returning the decoded token of either kind.
    pub fn decode(&self, token: &str) -> Result<DecodedToken, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| classify(e.kind()))?;
        let claims = data.claims;
        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(TokenError::Malformed)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::Malformed)?;
        Ok(DecodedToken {
            subject: claims.sub,
            kind: claims.typ,
            token_id: claims.jti,
            issued_at,
            expires_at,
        })
    }

    /// Decode and require a specific token kind.
    pub fn decode_expecting(
        &self,
        token: &str,
        expected: TokenKind,
    ) -> Result<DecodedToken, TokenError> {
        let decoded = self.decode(token)?;
        if decoded.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: decoded.kind,
            });
        }
        Ok(decoded)
    }
}

/// Map jsonwebtoken failures onto the three externally visible outcomes.
fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-signing-key";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET)
    }

    #[test]
    fn issue_then_decode_carries_subject_and_kind() {
        let c = codec();
        let token = c
            .issue("alice", TokenKind::Access, Duration::from_secs(60))
            .unwrap();
        let decoded = c.decode(&token).unwrap();
        assert_eq!(decoded.subject, "alice");
        assert_eq!(decoded.kind, TokenKind::Access);
        assert!(decoded.expires_at > Utc::now());
    }

    #[test]
    fn every_token_gets_its_own_id() {
        let c = codec();
        let a = c.issue("alice", TokenKind::Refresh, Duration::from_secs(60)).unwrap();
        let b = c.issue("alice", TokenKind::Refresh, Duration::from_secs(60)).unwrap();
        assert_ne!(c.decode(&a).unwrap().token_id, c.decode(&b).unwrap().token_id);
    }

    #[test]
    fn expired_token_with_valid_signature_is_expired() {
        let c = codec();
        let (token, _) = c
            .issue_at("alice", TokenKind::Access, Utc::now(), chrono::Duration::seconds(-5))
            .unwrap();
        assert_eq!(c.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn out_of_range_lifetime_is_an_encode_error() {
        let c = codec();
        let err = c
            .issue("alice", TokenKind::Refresh, Duration::from_secs(10_000_000_000_000))
            .unwrap_err();
        assert!(matches!(err, TokenError::Encode(_)));

        let err = c
            .issue_at("alice", TokenKind::Access, Utc::now(), chrono::Duration::MAX)
            .unwrap_err();
        assert!(matches!(err, TokenError::Encode(_)));
    }

    #[test]
    fn foreign_key_is_invalid_signature() {
        let token = TokenCodec::new(b"other-key")
            .issue("alice", TokenKind::Access, Duration::from_secs(60))
            .unwrap();
        assert_eq!(codec().decode(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn tampered_payload_is_invalid_signature() {
        let c = codec();
        let token = c.issue("alice", TokenKind::Access, Duration::from_secs(60)).unwrap();
        let forged_payload = c
            .issue("mallory", TokenKind::Access, Duration::from_secs(60))
            .unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged: Vec<&str> = forged_payload.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged[1], parts[2]);
        assert_eq!(c.decode(&spliced), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let c = codec();
        assert_eq!(c.decode("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(c.decode("a.b.c"), Err(TokenError::Malformed));
        assert_eq!(c.decode(""), Err(TokenError::Malformed));
    }

    #[test]
    fn kinds_are_not_interchangeable() {
        let c = codec();
        let refresh = c.issue("alice", TokenKind::Refresh, Duration::from_secs(60)).unwrap();
        let access = c.issue("alice", TokenKind::Access, Duration::from_secs(60)).unwrap();
        assert_eq!(
            c.decode_expecting(&refresh, TokenKind::Access),
            Err(TokenError::WrongKind {
                expected: TokenKind::Access,
                actual: TokenKind::Refresh,
            })
        );
        assert!(matches!(
            c.decode_expecting(&access, TokenKind::Refresh),
            Err(TokenError::WrongKind { .. })
        ));
        assert!(c.decode_expecting(&access, TokenKind::Access).is_ok());
    }
}
