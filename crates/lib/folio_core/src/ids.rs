// Token identifiers are UUIDv7 so refresh-token rows sort by issue time.

use uuid::Uuid;

/// Generate a fresh token id (`jti` claim).
pub fn token_id() -> Uuid {
    Uuid::now_v7()
}
