//! Books: public listing, owner-only mutation.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::AuthError;
use crate::auth::ownership::OwnershipGuard;
use crate::models::book::{Book, BookDraft, BookPage, NewBook};
use crate::store::{BookStore, CredentialStore};

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 100;
pub const MAX_CONTENT_LEN: usize = 1000;

/// Largest page size accepted by [`BookService::list`].
pub const MAX_PAGE_SIZE: u32 = 100;

pub struct BookService {
    books: Arc<dyn BookStore>,
    users: Arc<dyn CredentialStore>,
    guard: OwnershipGuard,
}

impl BookService {
    pub fn new(books: Arc<dyn BookStore>, users: Arc<dyn CredentialStore>) -> Self {
        Self {
            books,
            users,
            guard: OwnershipGuard::new(),
        }
    }

    /// One page of all books, newest first. `page` is 1-based.
    pub async fn list(&self, page: u32, size: u32) -> Result<BookPage, AuthError> {
        if page == 0 {
            return Err(AuthError::Validation("page must be at least 1".into()));
        }
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(AuthError::Validation(format!(
                "size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let offset = u64::from(page - 1) * u64::from(size);
        let (items, total_items) = self.books.list(offset, u64::from(size)).await?;
        Ok(BookPage {
            items,
            page,
            size,
            total_items,
            total_pages: total_items.div_ceil(u64::from(size)),
        })
    }

    pub async fn get(&self, id: i64) -> Result<Book, AuthError> {
        self.books
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("book {id}")))
    }

    /// Create a book owned by `subject`.
    pub async fn create(&self, subject: &str, draft: BookDraft) -> Result<Book, AuthError> {
        validate_draft(&draft)?;

        if !self.users.exists_by_id(subject).await? {
            warn!(user_id = %subject, "book creation for missing user");
            return Err(AuthError::UnknownIdentity);
        }
        self.require_category(draft.category_id).await?;

        let book = self
            .books
            .insert(NewBook {
                owner_id: subject.to_string(),
                category_id: draft.category_id,
                title: draft.title.trim().to_string(),
                description: draft.description.trim().to_string(),
                content: draft.content,
            })
            .await?;
        info!(user_id = %subject, book_id = book.id, "book created");
        Ok(book)
    }

    /// Replace the editable fields of a book. Only its owner may do this.
    pub async fn update(
        &self,
        subject: &str,
        id: i64,
        draft: BookDraft,
    ) -> Result<Book, AuthError> {
        validate_draft(&draft)?;

        let mut book = self.get(id).await?;
        self.guard.require(subject, &book.owner_id)?;
        self.require_category(draft.category_id).await?;

        book.category_id = draft.category_id;
        book.title = draft.title.trim().to_string();
        book.description = draft.description.trim().to_string();
        book.content = draft.content;

        let saved = self.books.update(book).await?;
        info!(user_id = %subject, book_id = id, "book updated");
        Ok(saved)
    }

    /// Delete a book. Only its owner may do this.
    pub async fn delete(&self, subject: &str, id: i64) -> Result<(), AuthError> {
        let book = self.get(id).await?;
        self.guard.require(subject, &book.owner_id)?;

        if !self.books.delete(id).await? {
            return Err(AuthError::NotFound(format!("book {id}")));
        }
        info!(user_id = %subject, book_id = id, "book deleted");
        Ok(())
    }

    /// Remove every book of a deleted account.
    pub async fn purge_owner(&self, owner_id: &str) -> Result<u64, AuthError> {
        let removed = self.books.delete_by_owner(owner_id).await?;
        if removed > 0 {
            info!(user_id = %owner_id, removed, "purged books of deleted account");
        }
        Ok(removed)
    }

    async fn require_category(&self, category_id: i64) -> Result<(), AuthError> {
        if !self.books.category_exists(category_id).await? {
            return Err(AuthError::Validation(format!(
                "unknown category {category_id}"
            )));
        }
        Ok(())
    }
}

fn validate_draft(draft: &BookDraft) -> Result<(), AuthError> {
    for (field, value, max) in [
        ("title", &draft.title, MAX_TITLE_LEN),
        ("description", &draft.description, MAX_DESCRIPTION_LEN),
        ("content", &draft.content, MAX_CONTENT_LEN),
    ] {
        if value.trim().is_empty() {
            return Err(AuthError::Validation(format!("{field} must not be blank")));
        }
        if value.chars().count() > max {
            return Err(AuthError::Validation(format!(
                "{field} must be at most {max} characters"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::auth::User;
    use crate::store::memory::{MemoryBookStore, MemoryCredentialStore};

    async fn service_with_users(ids: &[&str]) -> BookService {
        let users = Arc::new(MemoryCredentialStore::new());
        for id in ids {
            let now = Utc::now();
            users
                .insert(User {
                    id: id.to_string(),
                    password_hash: "$2b$04$x".into(),
                    name: id.to_string(),
                    api_key: None,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
        BookService::new(Arc::new(MemoryBookStore::new()), users)
    }

    fn draft(title: &str) -> BookDraft {
        BookDraft {
            category_id: 1,
            title: title.to_string(),
            description: "A short description".to_string(),
            content: "Once upon a time".to_string(),
        }
    }

    #[tokio::test]
    async fn create_sets_owner_from_subject() {
        let svc = service_with_users(&["alice"]).await;
        let book = svc.create("alice", draft("First")).await.unwrap();
        assert_eq!(book.owner_id, "alice");
        assert_eq!(svc.get(book.id).await.unwrap().title, "First");
    }

    #[tokio::test]
    async fn create_validates_fields() {
        let svc = service_with_users(&["alice"]).await;
        let mut blank = draft("x");
        blank.content = "   ".into();
        assert!(matches!(
            svc.create("alice", blank).await,
            Err(AuthError::Validation(_))
        ));

        let long = draft(&"t".repeat(MAX_TITLE_LEN + 1));
        assert!(matches!(
            svc.create("alice", long).await,
            Err(AuthError::Validation(_))
        ));

        let mut bad_category = draft("x");
        bad_category.category_id = 999;
        assert!(matches!(
            svc.create("alice", bad_category).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn create_requires_existing_author() {
        let svc = service_with_users(&[]).await;
        assert!(matches!(
            svc.create("ghost", draft("x")).await,
            Err(AuthError::UnknownIdentity)
        ));
    }

    #[tokio::test]
    async fn only_owner_may_update() {
        let svc = service_with_users(&["alice", "bob"]).await;
        let book = svc.create("alice", draft("Mine")).await.unwrap();

        assert!(matches!(
            svc.update("bob", book.id, draft("Hijacked")).await,
            Err(AuthError::AuthorizationDenied)
        ));
        assert_eq!(svc.get(book.id).await.unwrap().title, "Mine");

        let updated = svc.update("alice", book.id, draft("Still mine")).await.unwrap();
        assert_eq!(updated.title, "Still mine");
        assert_eq!(updated.owner_id, "alice");
    }

    #[tokio::test]
    async fn only_owner_may_delete() {
        let svc = service_with_users(&["alice", "bob"]).await;
        let book = svc.create("alice", draft("Mine")).await.unwrap();

        assert!(matches!(
            svc.delete("bob", book.id).await,
            Err(AuthError::AuthorizationDenied)
        ));
        svc.delete("alice", book.id).await.unwrap();
        assert!(matches!(svc.get(book.id).await, Err(AuthError::NotFound(_))));
    }

    #[tokio::test]
    async fn missing_book_is_not_found() {
        let svc = service_with_users(&["alice"]).await;
        assert!(matches!(
            svc.update("alice", 42, draft("x")).await,
            Err(AuthError::NotFound(_))
        ));
        assert!(matches!(svc.delete("alice", 42).await, Err(AuthError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_pages_are_one_based() {
        let svc = service_with_users(&["alice"]).await;
        for i in 0..3 {
            svc.create("alice", draft(&format!("b{i}"))).await.unwrap();
        }

        let first = svc.list(1, 2).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.total_items, 3);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.items[0].title, "b2");

        let second = svc.list(2, 2).await.unwrap();
        assert_eq!(second.items.len(), 1);

        assert!(matches!(svc.list(0, 10).await, Err(AuthError::Validation(_))));
        assert!(matches!(svc.list(1, 0).await, Err(AuthError::Validation(_))));
        assert!(matches!(
            svc.list(1, MAX_PAGE_SIZE + 1).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn purge_owner_removes_only_that_owner() {
        let svc = service_with_users(&["alice", "bob"]).await;
        svc.create("alice", draft("a")).await.unwrap();
        let kept = svc.create("bob", draft("b")).await.unwrap();

        assert_eq!(svc.purge_owner("alice").await.unwrap(), 1);
        let page = svc.list(1, 10).await.unwrap();
        assert_eq!(page.items, vec![kept]);
    }
}
