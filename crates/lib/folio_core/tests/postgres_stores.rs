//! Postgres store tests.
//!
//! These need a reachable database and are ignored by default:
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/folio_test cargo test -p folio_core -- --ignored
//! ```
//!
//! Every test works on its own freshly generated user ids, so runs against a
//! shared database do not interfere.

use std::sync::Arc;

use chrono::{Duration, Utc};
use folio_core::migrate::migrate;
use folio_core::models::auth::{User, UserChanges};
use folio_core::models::book::NewBook;
use folio_core::store::postgres::{PgBookStore, PgCredentialStore, PgRefreshTokenStore};
use folio_core::store::{BookStore, CredentialStore, RefreshTokenStore, StoreError};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("connect to DATABASE_URL");
    migrate(&pool).await.expect("run migrations");
    pool
}

fn unique_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

fn user(id: &str) -> User {
    let now = Utc::now();
    User {
        id: id.to_string(),
        password_hash: "$2b$04$hash".to_string(),
        name: "Someone".to_string(),
        api_key: None,
        created_at: now,
        updated_at: now,
    }
}

fn new_book(owner: &str, title: &str) -> NewBook {
    NewBook {
        owner_id: owner.to_string(),
        category_id: 1,
        title: title.to_string(),
        description: "d".to_string(),
        content: "c".to_string(),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_insert_is_conflict() {
    let users = PgCredentialStore::new(pool().await);
    let id = unique_id("dup");

    let stored = users.insert(user(&id)).await.unwrap();
    assert_eq!(stored.id, id);
    assert!(users.exists_by_id(&id).await.unwrap());

    let err = users.insert(user(&id)).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "{err:?}");

    assert!(users.delete(&id).await.unwrap());
    assert!(!users.delete(&id).await.unwrap());
    assert!(users.find_by_id(&id).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_inserts_admit_exactly_one() {
    let users = Arc::new(PgCredentialStore::new(pool().await));
    let id = unique_id("race");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let (users, id) = (users.clone(), id.clone());
        handles.push(tokio::spawn(async move { users.insert(user(&id)).await }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(StoreError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(ok, 1);
    users.delete(&id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn save_writes_only_present_fields() {
    let users = PgCredentialStore::new(pool().await);
    let id = unique_id("save");
    let mut initial = user(&id);
    initial.api_key = Some("sk-1".into());
    users.insert(initial).await.unwrap();

    users
        .save(
            &id,
            UserChanges {
                name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let saved = users
        .save(
            &id,
            UserChanges {
                password_hash: Some("$2b$04$other".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(saved.name, "Renamed");
    assert_eq!(saved.password_hash, "$2b$04$other");
    assert_eq!(saved.api_key.as_deref(), Some("sk-1"));

    let cleared = users
        .save(
            &id,
            UserChanges {
                api_key: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.api_key.is_none());
    assert_eq!(cleared.name, "Renamed");

    users.delete(&id).await.unwrap();
    let err = users.save(&id, UserChanges::default()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "{err:?}");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn consume_is_single_use() {
    let pool = pool().await;
    let users = PgCredentialStore::new(pool.clone());
    let tokens = PgRefreshTokenStore::new(pool);
    let id = unique_id("refresh");
    users.insert(user(&id)).await.unwrap();

    let jti = Uuid::now_v7().to_string();
    tokens
        .record(&jti, &id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    let first = tokens.consume(&jti).await.unwrap().expect("active token");
    assert_eq!(first.user_id, id);
    assert_eq!(first.id, jti);
    assert!(tokens.consume(&jti).await.unwrap().is_none());
    assert!(tokens.consume("not-a-uuid").await.unwrap().is_none());

    let other = Uuid::now_v7().to_string();
    tokens
        .record(&other, &id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    tokens.revoke_all_for(&id).await.unwrap();
    assert!(tokens.consume(&other).await.unwrap().is_none());

    users.delete(&id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn purge_removes_expired_records() {
    let pool = pool().await;
    let users = PgCredentialStore::new(pool.clone());
    let tokens = PgRefreshTokenStore::new(pool.clone());
    let id = unique_id("purge");
    users.insert(user(&id)).await.unwrap();

    let stale = Uuid::now_v7().to_string();
    let live = Uuid::now_v7().to_string();
    tokens
        .record(&stale, &id, Utc::now() - Duration::seconds(5))
        .await
        .unwrap();
    tokens
        .record(&live, &id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert!(tokens.consume(&stale).await.unwrap().is_none());

    assert!(tokens.purge_expired().await.unwrap() >= 1);
    let remaining =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1")
            .bind(&id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 1);
    assert!(tokens.consume(&live).await.unwrap().is_some());

    users.delete(&id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn delete_by_owner_counts_and_spares_others() {
    let pool = pool().await;
    let users = PgCredentialStore::new(pool.clone());
    let books = PgBookStore::new(pool);
    let owner = unique_id("owner");
    let other = unique_id("other");
    users.insert(user(&owner)).await.unwrap();
    users.insert(user(&other)).await.unwrap();

    for i in 0..3 {
        books.insert(new_book(&owner, &format!("t{i}"))).await.unwrap();
    }
    let kept = books.insert(new_book(&other, "kept")).await.unwrap();

    let fetched = books.find_by_id(kept.id).await.unwrap().expect("inserted book");
    assert_eq!(fetched.owner_id, other);
    assert_eq!(fetched.title, "kept");

    assert_eq!(books.delete_by_owner(&owner).await.unwrap(), 3);
    assert_eq!(books.delete_by_owner(&owner).await.unwrap(), 0);
    assert!(books.find_by_id(kept.id).await.unwrap().is_some());

    assert!(books.category_exists(1).await.unwrap());
    assert!(!books.category_exists(999_999).await.unwrap());

    users.delete(&owner).await.unwrap();
    users.delete(&other).await.unwrap();
}
