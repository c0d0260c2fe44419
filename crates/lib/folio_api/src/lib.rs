//! # folio_api
//!
//! HTTP API library for Folio.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post, put};
use folio_core::auth::AuthError;
use folio_core::auth::session::SessionManager;
use folio_core::books::BookService;
use folio_core::store::memory::{MemoryBookStore, MemoryCredentialStore, MemoryRefreshTokenStore};
use folio_core::store::postgres::{PgBookStore, PgCredentialStore, PgRefreshTokenStore};
use folio_core::store::{BookStore, CredentialStore, RefreshTokenStore};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, books};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session lifecycle over the credential and refresh-token stores.
    pub sessions: Arc<SessionManager>,
    /// Book listing and owner-only mutation.
    pub books: Arc<BookService>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Wire the services over explicit store implementations.
    pub fn from_stores(
        config: ApiConfig,
        users: Arc<dyn CredentialStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        books: Arc<dyn BookStore>,
    ) -> Result<Self, AuthError> {
        let sessions = SessionManager::new(config.auth_config(), users.clone(), refresh_tokens)?;
        Ok(Self {
            sessions: Arc::new(sessions),
            books: Arc::new(BookService::new(books, users)),
            config,
        })
    }

    /// State backed by the in-memory stores. Nothing survives a restart.
    pub fn in_memory(config: ApiConfig) -> Result<Self, AuthError> {
        Self::from_stores(
            config,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryRefreshTokenStore::new()),
            Arc::new(MemoryBookStore::new()),
        )
    }

    /// State backed by PostgreSQL. Run [`migrate`] on the pool first.
    pub fn postgres(config: ApiConfig, pool: PgPool) -> Result<Self, AuthError> {
        Self::from_stores(
            config,
            Arc::new(PgCredentialStore::new(pool.clone())),
            Arc::new(PgRefreshTokenStore::new(pool.clone())),
            Arc::new(PgBookStore::new(pool)),
        )
    }
}

/// Run embedded database migrations.
///
/// Delegates to `folio_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    folio_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/api/auth/signup", post(auth::signup_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/auth/token/refresh", post(auth::refresh_handler))
        .route("/api/books", get(books::list_books_handler))
        .route("/api/books/{id}", get(books::get_book_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/api/auth/update", patch(auth::update_handler))
        .route("/api/auth/delete", post(auth::delete_handler))
        .route("/api/auth/token/validate", post(auth::validate_handler))
        .route("/api/auth/me", get(auth::me_handler))
        .route("/api/auth/api-key", get(auth::api_key_handler))
        .route("/api/books", post(books::create_book_handler))
        .route(
            "/api/books/{id}",
            put(books::update_book_handler).delete(books::delete_book_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
