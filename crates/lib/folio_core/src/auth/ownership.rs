//! Single-owner authorization for mutating operations.

use tracing::warn;

use super::AuthError;

/// Outcome of an ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

/// Restricts mutation of an owned resource to its creator.
///
/// Denials surface as [`AuthError::AuthorizationDenied`] (HTTP 403) rather
/// than being masked as not-found: book listings are public, so existence
/// of a resource is not secret.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipGuard;

impl OwnershipGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn authorize(&self, subject: &str, owner_id: &str) -> Access {
        if !subject.is_empty() && subject == owner_id {
            Access::Allowed
        } else {
            Access::Denied
        }
    }

    /// [`authorize`](Self::authorize), turning a denial into an error.
    pub fn require(&self, subject: &str, owner_id: &str) -> Result<(), AuthError> {
        match self.authorize(subject, owner_id) {
            Access::Allowed => Ok(()),
            Access::Denied => {
                warn!(subject, owner_id, "ownership check denied");
                Err(AuthError::AuthorizationDenied)
            }
        }
    }
}
