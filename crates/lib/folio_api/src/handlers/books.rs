//! Book request handlers. Listing and reading are public; mutation is owner-only.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, BookPageResponse, BookRequest, BookResponse, PageParams};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PAGE_SIZE: u32 = 10;

/// `GET /api/books?page=&size=`: one page of all books, newest first.
pub async fn list_books_handler(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<ApiResponse<BookPageResponse>>> {
    let page = state
        .books
        .list(
            params.page.unwrap_or(DEFAULT_PAGE),
            params.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(Json(ApiResponse::success("Books", page.into())))
}

/// `GET /api/books/{id}`
pub async fn get_book_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<BookResponse>>> {
    let book = state.books.get(id).await?;
    Ok(Json(ApiResponse::success("Book", book.into())))
}

/// `POST /api/books`: create a book owned by the caller.
pub async fn create_book_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<BookRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BookResponse>>)> {
    let book = state.books.create(&user.subject, body.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Book created", book.into())),
    ))
}

/// `PUT /api/books/{id}`: replace a book's fields. Owner only.
pub async fn update_book_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(body): Json<BookRequest>,
) -> AppResult<Json<ApiResponse<BookResponse>>> {
    let book = state.books.update(&user.subject, id, body.into()).await?;
    Ok(Json(ApiResponse::success("Book updated", book.into())))
}

/// `DELETE /api/books/{id}`: owner only.
pub async fn delete_book_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.books.delete(&user.subject, id).await?;
    Ok(Json(ApiResponse::message("Book deleted")))
}
