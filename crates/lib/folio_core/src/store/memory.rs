//! In-memory store backends.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{BookStore, CredentialStore, RefreshTokenStore, StoreError, StoreResult};
use crate::models::auth::{RefreshTokenRecord, User, UserChanges};
use crate::models::book::{Book, NewBook};

/// Users keyed by id.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: DashMap<String, User>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn exists_by_id(&self, id: &str) -> StoreResult<bool> {
        Ok(self.users.contains_key(id))
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn insert(&self, user: User) -> StoreResult<User> {
        // The entry guard holds the shard lock, so two inserts of one id cannot both land.
        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "user '{}' already exists",
                user.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn save(&self, id: &str, changes: UserChanges) -> StoreResult<User> {
        let Some(mut user) = self.users.get_mut(id) else {
            return Err(StoreError::NotFound(format!("user '{id}'")));
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(api_key) = changes.api_key {
            user.api_key = api_key;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.users.remove(id).is_some())
    }
}

#[derive(Debug, Clone)]
struct RefreshEntry {
    user_id: String,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

/// Refresh token records keyed by token id. Revoked entries are kept until
/// they expire so that replay of a rotated token can be told apart from an
/// unknown one.
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenStore {
    tokens: DashMap<String, RefreshEntry>,
}

impl MemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active, unexpired tokens for a user.
    pub fn active_count(&self, user_id: &str) -> usize {
        let now = Utc::now();
        self.tokens
            .iter()
            .filter(|e| e.user_id == user_id && !e.revoked && e.expires_at > now)
            .count()
    }

    /// Number of stored records, revoked and expired ones included.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn record(
        &self,
        token_id: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.tokens.insert(
            token_id.to_string(),
            RefreshEntry {
                user_id: user_id.to_string(),
                expires_at,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn consume(&self, token_id: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let Some(mut entry) = self.tokens.get_mut(token_id) else {
            return Ok(None);
        };
        if entry.revoked || entry.expires_at <= Utc::now() {
            return Ok(None);
        }
        entry.revoked = true;
        Ok(Some(RefreshTokenRecord {
            id: token_id.to_string(),
            user_id: entry.user_id.clone(),
            expires_at: entry.expires_at,
        }))
    }

    async fn revoke(&self, token_id: &str) -> StoreResult<()> {
        if let Some(mut entry) = self.tokens.get_mut(token_id) {
            entry.revoked = true;
        }
        Ok(())
    }

    async fn revoke_all_for(&self, user_id: &str) -> StoreResult<()> {
        self.tokens
            .iter_mut()
            .filter(|e| e.user_id == user_id)
            .for_each(|mut e| e.revoked = true);
        Ok(())
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let now = Utc::now();
        let mut removed = 0;
        self.tokens.retain(|_, entry| {
            let keep = entry.expires_at > now;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

/// Books keyed by id, with a fixed category table.
#[derive(Debug)]
pub struct MemoryBookStore {
    books: DashMap<i64, Book>,
    categories: Vec<i64>,
    next_id: AtomicI64,
}

impl MemoryBookStore {
    /// Store seeded with the same category ids as the SQL migration.
    pub fn new() -> Self {
        Self::with_categories([1, 2, 3, 4, 5])
    }

    pub fn with_categories(categories: impl IntoIterator<Item = i64>) -> Self {
        Self {
            books: DashMap::new(),
            categories: categories.into_iter().collect(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryBookStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Book>> {
        Ok(self.books.get(&id).map(|b| b.clone()))
    }

    async fn insert(&self, book: NewBook) -> StoreResult<Book> {
        let now = Utc::now();
        let stored = Book {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            owner_id: book.owner_id,
            category_id: book.category_id,
            title: book.title,
            description: book.description,
            content: book.content,
            created_at: now,
            updated_at: now,
        };
        self.books.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, book: Book) -> StoreResult<Book> {
        let Some(mut existing) = self.books.get_mut(&book.id) else {
            return Err(StoreError::NotFound(format!("book {}", book.id)));
        };
        existing.category_id = book.category_id;
        existing.title = book.title;
        existing.description = book.description;
        existing.content = book.content;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        Ok(self.books.remove(&id).is_some())
    }

    async fn delete_by_owner(&self, owner_id: &str) -> StoreResult<u64> {
        let mut removed = 0;
        self.books.retain(|_, b| {
            let owned = b.owner_id == owner_id;
            if owned {
                removed += 1;
            }
            !owned
        });
        Ok(removed)
    }

    async fn list(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Book>, u64)> {
        let mut all: Vec<Book> = self.books.iter().map(|b| b.clone()).collect();
        all.sort_by(|a, b| b.id.cmp(&a.id));
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((items, total))
    }

    async fn category_exists(&self, category_id: i64) -> StoreResult<bool> {
        Ok(self.categories.contains(&category_id))
    }
}
