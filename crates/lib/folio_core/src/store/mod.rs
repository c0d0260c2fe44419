//! Persistence contracts consumed by the core.
//!
//! Two backends implement them: [`memory`] (DashMap, used by default and in
//! tests) and [`postgres`] (sqlx). Uniqueness and single-use guarantees are
//! enforced atomically inside each store, never by check-then-act in callers.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::auth::{RefreshTokenRecord, User, UserChanges};
use crate::models::book::{Book, NewBook};

/// Store-level failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Unavailable(e.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn exists_by_id(&self, id: &str) -> StoreResult<bool>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    /// Insert a new user; fails with [`StoreError::Conflict`] if the id is taken.
    async fn insert(&self, user: User) -> StoreResult<User>;

    /// Write the fields present in `changes` onto an existing user in a single
    /// atomic update and return the result. Fails with [`StoreError::NotFound`]
    /// if absent.
    async fn save(&self, id: &str, changes: UserChanges) -> StoreResult<User>;

    /// Delete a user. Returns whether a row was removed.
    async fn delete(&self, id: &str) -> StoreResult<bool>;
}

/// Issued refresh tokens, keyed by their `jti`.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn record(
        &self,
        token_id: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Atomically revoke an active, unexpired token and return its record.
    /// A second call with the same id returns `None`.
    async fn consume(&self, token_id: &str) -> StoreResult<Option<RefreshTokenRecord>>;

    async fn revoke(&self, token_id: &str) -> StoreResult<()>;

    async fn revoke_all_for(&self, user_id: &str) -> StoreResult<()>;

    /// Drop every record past its expiry, returning how many were removed.
    async fn purge_expired(&self) -> StoreResult<u64>;
}

/// Book records and category reference data.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Book>>;

    async fn insert(&self, book: NewBook) -> StoreResult<Book>;

    /// Overwrite title, description, content and category of an existing book.
    async fn update(&self, book: Book) -> StoreResult<Book>;

    async fn delete(&self, id: i64) -> StoreResult<bool>;

    /// Remove every book owned by `owner_id`, returning how many were removed.
    async fn delete_by_owner(&self, owner_id: &str) -> StoreResult<u64>;

    /// Newest first. `offset`/`limit` are row counts.
    async fn list(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Book>, u64)>;

    async fn category_exists(&self, category_id: i64) -> StoreResult<bool>;
}
