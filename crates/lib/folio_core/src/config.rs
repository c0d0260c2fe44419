//! Session and credential configuration.

use std::time::Duration;

/// Access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);

/// Refresh token lifetime: 14 days.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Longest accepted token lifetime: 10 years.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Upper bound on a single store call made by the session layer.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Immutable configuration handed to `SessionManager` at construction.
///
/// Changing `jwt_secret` invalidates every outstanding access and refresh token.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret.
    pub jwt_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub bcrypt_cost: u32,
    /// Deadline applied to every credential/refresh store call.
    pub store_timeout: Duration,
    /// Report unknown ids as `BadCredential` instead of `UnknownIdentity` on login.
    pub mask_unknown_identity: bool,
}

impl AuthConfig {
    /// Configuration with default lifetimes for the given secret.
    pub fn new(jwt_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            mask_unknown_identity: false,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("store_timeout", &self.store_timeout)
            .field("mask_unknown_identity", &self.mask_unknown_identity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_secret() {
        let config = AuthConfig::new("super-secret-value");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn defaults_are_applied() {
        let config = AuthConfig::new("k");
        assert_eq!(config.access_ttl, DEFAULT_ACCESS_TTL);
        assert_eq!(config.refresh_ttl, DEFAULT_REFRESH_TTL);
        assert!(!config.mask_unknown_identity);
    }
}
