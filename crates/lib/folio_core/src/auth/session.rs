//! Session lifecycle: signup, login, token validation, refresh rotation,
//! profile changes and account deletion.
//!
//! Access tokens are stateless: nothing server-side is consulted to accept
//! one, so logout and account deletion cannot cut an outstanding access token
//! short. It stays valid until `access_ttl` runs out. Refresh tokens are
//! recorded by id so that each one can be used exactly once.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::jwt::{TokenCodec, TokenError};
use super::password::PasswordHasher;
use super::{AuthError, TokenRejection};
use crate::config::AuthConfig;
use crate::models::auth::{
    ProfileUpdate, TokenKind, TokenPair, User, UserChanges, UserProfile,
};
use crate::store::{CredentialStore, RefreshTokenStore, StoreError, StoreResult};

/// Longest accepted user id.
const MAX_ID_LEN: usize = 64;

/// Verified against when the login id is unknown, so both failure paths pay
/// for one bcrypt comparison.
const DUMMY_PASSWORD: &str = "folio-timing-equalizer";

/// Orchestrates the session lifecycle over the credential and refresh stores.
pub struct SessionManager {
    users: Arc<dyn CredentialStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    codec: TokenCodec,
    hasher: PasswordHasher,
    config: AuthConfig,
    dummy_digest: String,
}

impl SessionManager {
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn CredentialStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
    ) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(config.bcrypt_cost);
        let dummy_digest = hasher.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            users,
            refresh_tokens,
            codec: TokenCodec::new(&config.jwt_secret),
            hasher,
            config,
            dummy_digest,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Register a new user. No session is created.
    pub async fn signup(
        &self,
        id: &str,
        password: &str,
        name: &str,
    ) -> Result<UserProfile, AuthError> {
        require_non_blank("id", id)?;
        require_non_blank("password", password)?;
        require_non_blank("name", name)?;
        if id.trim() != id || id.chars().count() > MAX_ID_LEN {
            return Err(AuthError::Validation(format!(
                "id must be at most {MAX_ID_LEN} characters without surrounding whitespace"
            )));
        }

        let now = Utc::now();
        let user = User {
            id: id.to_string(),
            password_hash: self.hasher.hash(password)?,
            name: name.trim().to_string(),
            api_key: None,
            created_at: now,
            updated_at: now,
        };

        match self.bounded("insert user", self.users.insert(user)).await {
            Ok(user) => {
                info!(user_id = %user.id, "user registered");
                Ok(UserProfile::from(&user))
            }
            Err(AuthError::DuplicateIdentity) => {
                warn!(user_id = %id, "signup rejected: id already registered");
                Err(AuthError::DuplicateIdentity)
            }
            Err(e) => Err(e),
        }
    }

    /// Authenticate with id + password and issue an access/refresh pair.
    pub async fn login(&self, id: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self.bounded("find user", self.users.find_by_id(id)).await?;

        let user = match user {
            Some(user) => user,
            None => {
                self.hasher.verify(password, &self.dummy_digest);
                warn!(user_id = %id, "login rejected: unknown id");
                return Err(if self.config.mask_unknown_identity {
                    AuthError::BadCredential
                } else {
                    AuthError::UnknownIdentity
                });
            }
        };

        if !self.hasher.verify(password, &user.password_hash) {
            warn!(user_id = %id, "login rejected: password mismatch");
            return Err(AuthError::BadCredential);
        }

        let pair = self.issue_pair(&user.id).await?;
        info!(user_id = %user.id, "login succeeded");
        Ok(pair)
    }

    /// Validate the access token and revoke `refresh_token` if it belongs to
    /// the same subject. Returns the subject.
    pub async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<String, AuthError> {
        let access = self
            .codec
            .decode_expecting(access_token, TokenKind::Access)
            .map_err(|e| {
                warn!(error = %e, "logout rejected");
                as_invalid(e)
            })?;

        if let Some(refresh_token) = refresh_token
            && let Ok(refresh) = self.codec.decode_expecting(refresh_token, TokenKind::Refresh)
            && refresh.subject == access.subject
        {
            self.bounded(
                "revoke refresh token",
                self.refresh_tokens.revoke(&refresh.token_id),
            )
            .await?;
        }

        info!(user_id = %access.subject, "logged out");
        Ok(access.subject)
    }

    /// Resolve an access token to its subject.
    pub fn validate_access(&self, token: &str) -> Result<String, AuthError> {
        self.codec
            .decode_expecting(token, TokenKind::Access)
            .map(|decoded| decoded.subject)
            .map_err(|e| {
                debug!(error = %e, "access token rejected");
                AuthError::from(e)
            })
    }

    /// Exchange a refresh token for a new access token and a rotated refresh
    /// token. The presented refresh token is consumed.
    ///
    /// Presenting an already consumed refresh token revokes every refresh
    /// token of its subject.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let presented = self
            .codec
            .decode_expecting(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                warn!(error = %e, "refresh rejected");
                as_invalid(e)
            })?;

        let record = self
            .bounded(
                "consume refresh token",
                self.refresh_tokens.consume(&presented.token_id),
            )
            .await?;

        let Some(record) = record else {
            warn!(user_id = %presented.subject, "refresh token reuse; revoking all refresh tokens");
            self.bounded(
                "revoke refresh tokens",
                self.refresh_tokens.revoke_all_for(&presented.subject),
            )
            .await?;
            return Err(AuthError::InvalidToken(TokenRejection::Revoked));
        };

        if record.user_id != presented.subject {
            warn!(user_id = %presented.subject, "refresh token record bound to another user");
            return Err(AuthError::InvalidToken(TokenRejection::Revoked));
        }

        if !self
            .bounded("check user", self.users.exists_by_id(&presented.subject))
            .await?
        {
            warn!(user_id = %presented.subject, "refresh for deleted user");
            return Err(AuthError::InvalidToken(TokenRejection::Revoked));
        }

        let pair = self.issue_pair(&presented.subject).await?;
        info!(user_id = %presented.subject, "tokens refreshed");
        Ok(pair)
    }

    /// Apply the fields present in `update` to the caller's own record in a
    /// single store write, leaving the other fields as stored.
    ///
    /// A password change revokes every refresh token of the user.
    pub async fn change_profile(
        &self,
        access_token: &str,
        update: ProfileUpdate,
    ) -> Result<UserProfile, AuthError> {
        let subject = self.validate_access(access_token)?;
        if update.is_empty() {
            return Err(AuthError::Validation("no fields to update".into()));
        }

        let mut changes = UserChanges::default();
        if let Some(name) = update.name {
            require_non_blank("name", &name)?;
            changes.name = Some(name.trim().to_string());
        }
        if let Some(password) = update.password {
            require_non_blank("password", &password)?;
            changes.password_hash = Some(self.hasher.hash(&password)?);
        }
        if let Some(api_key) = update.api_key {
            let api_key = api_key.trim();
            changes.api_key = Some((!api_key.is_empty()).then(|| api_key.to_string()));
        }
        let password_changed = changes.password_hash.is_some();

        let saved = self
            .bounded("save user", self.users.save(&subject, changes))
            .await
            .map_err(|e| match e {
                AuthError::NotFound(_) => AuthError::UnknownIdentity,
                other => other,
            })?;

        if password_changed {
            self.bounded(
                "revoke refresh tokens",
                self.refresh_tokens.revoke_all_for(&subject),
            )
            .await?;
            info!(user_id = %subject, "password changed; refresh tokens revoked");
        }

        info!(user_id = %subject, "profile updated");
        Ok(UserProfile::from(&saved))
    }

    /// Delete the caller's account after re-verifying the password.
    ///
    /// Returns the deleted subject so callers can clean up owned resources.
    pub async fn delete_account(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        let subject = self.validate_access(access_token)?;
        let user = self.load_user(&subject).await?;

        if !self.hasher.verify(password, &user.password_hash) {
            warn!(user_id = %subject, "account deletion rejected: password mismatch");
            return Err(AuthError::BadCredential);
        }

        self.bounded(
            "revoke refresh tokens",
            self.refresh_tokens.revoke_all_for(&subject),
        )
        .await?;
        if !self.bounded("delete user", self.users.delete(&subject)).await? {
            return Err(AuthError::UnknownIdentity);
        }

        info!(user_id = %subject, "account deleted");
        Ok(subject)
    }

    /// The caller's own profile.
    pub async fn profile(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let subject = self.validate_access(access_token)?;
        let user = self.load_user(&subject).await?;
        Ok(UserProfile::from(&user))
    }

    /// The caller's stored third-party API key, if any.
    pub async fn api_key(&self, access_token: &str) -> Result<Option<String>, AuthError> {
        let subject = self.validate_access(access_token)?;
        Ok(self.load_user(&subject).await?.api_key)
    }

    async fn load_user(&self, subject: &str) -> Result<User, AuthError> {
        self.bounded("find user", self.users.find_by_id(subject))
            .await?
            .ok_or(AuthError::UnknownIdentity)
    }

    async fn issue_pair(&self, subject: &str) -> Result<TokenPair, AuthError> {
        let access_expires_in = lifetime_secs(self.config.access_ttl)?;
        let refresh_expires_in = lifetime_secs(self.config.refresh_ttl)?;

        let access_token = self
            .codec
            .issue(subject, TokenKind::Access, self.config.access_ttl)?;

        let refresh_ttl = chrono::Duration::from_std(self.config.refresh_ttl)
            .map_err(|e| AuthError::Internal(format!("refresh ttl: {e}")))?;
        let (refresh_token, claims) =
            self.codec
                .issue_at(subject, TokenKind::Refresh, Utc::now(), refresh_ttl)?;
        let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::Internal("refresh expiry out of range".into()))?;

        self.bounded(
            "record refresh token",
            self.refresh_tokens.record(&claims.jti, subject, expires_at),
        )
        .await?;

        // Housekeeping only; a failed purge does not fail the login.
        match self
            .bounded("purge refresh tokens", self.refresh_tokens.purge_expired())
            .await
        {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "purged expired refresh tokens"),
            Err(e) => warn!(error = %e, "refresh token purge failed"),
        }

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_in,
            refresh_expires_in,
        })
    }

    /// Run a store call under the configured deadline.
    async fn bounded<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = StoreResult<T>>,
    ) -> Result<T, AuthError> {
        match timeout(self.config.store_timeout, call).await {
            Ok(result) => result.map_err(|e: StoreError| {
                if let StoreError::Unavailable(msg) = &e {
                    warn!(op, error = %msg, "store call failed");
                }
                AuthError::from(e)
            }),
            Err(_) => {
                warn!(op, timeout = ?self.config.store_timeout, "store call timed out");
                Err(AuthError::StoreUnavailable(format!("{op} timed out")))
            }
        }
    }
}

fn lifetime_secs(ttl: std::time::Duration) -> Result<i64, AuthError> {
    i64::try_from(ttl.as_secs())
        .map_err(|_| AuthError::Internal(format!("lifetime {ttl:?} out of range")))
}

fn require_non_blank(field: &str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}

/// Token failures for operations that report every rejection as invalid.
fn as_invalid(e: TokenError) -> AuthError {
    let rejection = match e {
        TokenError::Expired => TokenRejection::Expired,
        TokenError::InvalidSignature => TokenRejection::InvalidSignature,
        TokenError::Malformed => TokenRejection::Malformed,
        TokenError::WrongKind { .. } => TokenRejection::WrongKind,
        TokenError::Encode(msg) => return AuthError::Internal(msg),
    };
    AuthError::InvalidToken(rejection)
}
