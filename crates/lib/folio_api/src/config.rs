//! API server configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use folio_core::config::{
    AuthConfig, DEFAULT_ACCESS_TTL, DEFAULT_BCRYPT_COST, DEFAULT_REFRESH_TTL, MAX_TTL,
};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{info, warn};

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3100";

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL. `None` selects the in-memory stores.
    pub database_url: Option<String>,
    /// JWT signing secret.
    pub jwt_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub bcrypt_cost: u32,
    /// Set the `Secure` attribute on the refresh cookie.
    pub cookie_secure: bool,
    /// Report unknown login ids as bad credentials.
    pub mask_unknown_identity: bool,
}

impl ApiConfig {
    /// Default configuration around an explicit signing secret.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            database_url: None,
            jwt_secret: jwt_secret.into(),
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            cookie_secure: false,
            mask_unknown_identity: false,
        }
    }

    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                 | Default                        |
    /// |--------------------------|--------------------------------|
    /// | `BIND_ADDR`              | `127.0.0.1:3100`               |
    /// | `DATABASE_URL`           | unset (in-memory stores)       |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file |
    /// | `ACCESS_TOKEN_TTL_SECS`  | `900`                          |
    /// | `REFRESH_TOKEN_TTL_SECS` | `1209600`                      |
    /// | `BCRYPT_COST`            | `10`                           |
    /// | `COOKIE_SECURE`          | `false`                        |
    /// | `MASK_UNKNOWN_IDENTITY`  | `false`                        |
    pub fn from_env() -> Self {
        let defaults = Self::with_secret(String::new());
        Self {
            bind_addr: non_empty_env("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: non_empty_env("DATABASE_URL"),
            jwt_secret: resolve_jwt_secret(),
            access_ttl: env_secs("ACCESS_TOKEN_TTL_SECS", defaults.access_ttl),
            refresh_ttl: env_secs("REFRESH_TOKEN_TTL_SECS", defaults.refresh_ttl),
            bcrypt_cost: env_parse("BCRYPT_COST", defaults.bcrypt_cost),
            cookie_secure: env_flag("COOKIE_SECURE", defaults.cookie_secure),
            mask_unknown_identity: env_flag(
                "MASK_UNKNOWN_IDENTITY",
                defaults.mask_unknown_identity,
            ),
        }
    }

    /// Core session configuration derived from this API configuration.
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            access_ttl: self.access_ttl,
            refresh_ttl: self.refresh_ttl,
            bcrypt_cost: self.bcrypt_cost,
            mask_unknown_identity: self.mask_unknown_identity,
            ..AuthConfig::new(self.jwt_secret.as_bytes())
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("jwt_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("cookie_secure", &self.cookie_secure)
            .field("mask_unknown_identity", &self.mask_unknown_identity)
            .finish()
    }
}

/// Resolve the JWT signing secret.
///
/// `JWT_SECRET` wins, then `AUTH_SECRET`. Otherwise a secret is read from (or
/// generated into) the platform data directory so restarts keep sessions.
pub fn resolve_jwt_secret() -> String {
    if let Some(secret) = non_empty_env("JWT_SECRET") {
        return secret;
    }
    if let Some(secret) = non_empty_env("AUTH_SECRET") {
        return secret;
    }
    load_or_generate_secret(&jwt_secret_path())
}

/// Read the secret stored at `path`, generating and persisting one if absent.
pub fn load_or_generate_secret(path: &Path) -> String {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!(path = %parent.display(), error = %e, "cannot create secret directory");
    }
    match std::fs::write(path, &secret) {
        Ok(()) => info!(path = %path.display(), "generated new JWT secret"),
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "cannot persist JWT secret; sessions will not survive a restart"
        ),
    }
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("folio")
        .join("jwt-secret")
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match non_empty_env(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "ignoring unparsable value");
            default
        }),
        None => default,
    }
}

fn env_secs(name: &str, default: Duration) -> Duration {
    let secs = env_parse(name, default.as_secs());
    ttl_from_secs(secs).unwrap_or_else(|| {
        warn!(
            var = name,
            value = secs,
            max = MAX_TTL.as_secs(),
            "ignoring out-of-range lifetime"
        );
        default
    })
}

/// A lifetime between one second and [`MAX_TTL`].
fn ttl_from_secs(secs: u64) -> Option<Duration> {
    (1..=MAX_TTL.as_secs())
        .contains(&secs)
        .then(|| Duration::from_secs(secs))
}

fn env_flag(name: &str, default: bool) -> bool {
    match non_empty_env(name) {
        Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
            warn!(var = name, value = %raw, "ignoring unparsable flag");
            default
        }),
        None => default,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
