//! Postgres store backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{BookStore, CredentialStore, RefreshTokenStore, StoreError, StoreResult};
use crate::models::auth::{RefreshTokenRecord, User, UserChanges};
use crate::models::book::{Book, NewBook};

type UserRow = (
    String,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn user_from_row(
    (id, password_hash, name, api_key, created_at, updated_at): UserRow,
) -> User {
    User {
        id,
        password_hash,
        name,
        api_key,
        created_at,
        updated_at,
    }
}

/// `users` table.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn exists_by_id(&self, id: &str) -> StoreResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, password_hash, name, api_key, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(user_from_row))
    }

    async fn insert(&self, user: User) -> StoreResult<User> {
        // ON CONFLICT keeps the uniqueness check and the write in one statement.
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, password_hash, name, api_key) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO NOTHING \
             RETURNING id, password_hash, name, api_key, created_at, updated_at",
        )
        .bind(&user.id)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.api_key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(user_from_row)
            .ok_or_else(|| StoreError::Conflict(format!("user '{}' already exists", user.id)))
    }

    async fn save(&self, id: &str, changes: UserChanges) -> StoreResult<User> {
        // Absent fields keep their column value inside the same statement.
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 password_hash = COALESCE($3, password_hash), \
                 api_key = CASE WHEN $4 THEN $5 ELSE api_key END, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING id, password_hash, name, api_key, created_at, updated_at",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.password_hash)
        .bind(changes.api_key.is_some())
        .bind(changes.api_key.flatten())
        .fetch_optional(&self.pool)
        .await?;
        row.map(user_from_row)
            .ok_or_else(|| StoreError::NotFound(format!("user '{id}'")))
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// `refresh_tokens` table.
#[derive(Debug, Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn record(
        &self,
        token_id: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let id = Uuid::parse_str(token_id)
            .map_err(|e| StoreError::Unavailable(format!("token id: {e}")))?;
        sqlx::query("INSERT INTO refresh_tokens (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn consume(&self, token_id: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let Ok(id) = Uuid::parse_str(token_id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>)>(
            "UPDATE refresh_tokens SET revoked_at = now() \
             WHERE id = $1 AND revoked_at IS NULL AND expires_at > now() \
             RETURNING id, user_id, expires_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, user_id, expires_at)| RefreshTokenRecord {
            id: id.to_string(),
            user_id,
            expires_at,
        }))
    }

    async fn revoke(&self, token_id: &str) -> StoreResult<()> {
        let Ok(id) = Uuid::parse_str(token_id) else {
            return Ok(());
        };
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_all_for(&self, user_id: &str) -> StoreResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() \
             WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Row returned by book queries.
#[derive(Debug, Clone, sqlx::FromRow)]
struct BookRow {
    id: i64,
    owner_id: String,
    category_id: i64,
    title: String,
    description: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            id: row.id,
            owner_id: row.owner_id,
            category_id: row.category_id,
            title: row.title,
            description: row.description,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const BOOK_COLUMNS: &str =
    "id, user_id AS owner_id, category_id, title, description, content, created_at, updated_at";

/// `books` and `categories` tables.
#[derive(Debug, Clone)]
pub struct PgBookStore {
    pool: PgPool,
}

impl PgBookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for PgBookStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Book::from))
    }

    async fn insert(&self, book: NewBook) -> StoreResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "INSERT INTO books (user_id, category_id, title, description, content) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&book.owner_id)
        .bind(book.category_id)
        .bind(&book.title)
        .bind(&book.description)
        .bind(&book.content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, book: Book) -> StoreResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "UPDATE books \
             SET category_id = $2, title = $3, description = $4, content = $5, updated_at = now() \
             WHERE id = $1 \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book.id)
        .bind(book.category_id)
        .bind(&book.title)
        .bind(&book.description)
        .bind(&book.content)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Book::from)
            .ok_or_else(|| StoreError::NotFound(format!("book {}", book.id)))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_owner(&self, owner_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM books WHERE user_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Book>, u64)> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Book::from).collect(), total as u64))
    }

    async fn category_exists(&self, category_id: i64) -> StoreResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(category_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}
