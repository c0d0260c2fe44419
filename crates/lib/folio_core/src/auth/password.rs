//! Password hashing via bcrypt.

use tracing::debug;

use super::AuthError;
use crate::config::DEFAULT_BCRYPT_COST;

/// bcrypt only reads this many bytes of input; anything longer is rejected
/// rather than silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Salted, deliberately slow one-way hashing of credentials.
///
/// bcrypt salts every digest and compares in constant time.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password with bcrypt at the configured cost.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::Validation(format!(
                "password must be at most {MAX_PASSWORD_BYTES} bytes"
            )));
        }
        bcrypt::hash(password, self.cost)
            .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
    }

    /// Verify a password against a bcrypt digest.
    ///
    /// A malformed digest verifies as `false` instead of erroring, as does a
    /// password too long to have been hashed.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        if password.len() > MAX_PASSWORD_BYTES {
            return false;
        }
        match bcrypt::verify(password, digest) {
            Ok(matches) => matches,
            Err(e) => {
                debug!(error = %e, "rejecting unparseable password digest");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}
