//! Request and response shapes of the HTTP API.
//!
//! Every response is wrapped in an [`ApiResponse`] envelope. Field names are
//! camelCase on the wire.

use chrono::{DateTime, Utc};
use folio_core::models::auth::{ProfileUpdate, UserProfile};
use folio_core::models::book::{Book, BookDraft, BookPage};
use serde::{Deserialize, Serialize};

/// Success envelope: `{"status": "success", "message": ..., "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Envelope without a payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data: None,
        }
    }
}

/// Error envelope: the success shape plus a machine-readable `error` code.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
    pub message: String,
    pub data: Option<()>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: "error",
            error: error.into(),
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub id: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub id: String,
    pub password: String,
}

/// Partial profile update. Absent and `null` fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfileUpdate {
            name: req.name,
            password: req.password,
            api_key: req.api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

/// Issued access token. The refresh token travels only in its cookie.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until the access token expires.
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub name: String,
    pub has_api_key: bool,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            has_api_key: profile.has_api_key,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResponse {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
}

impl From<BookRequest> for BookDraft {
    fn from(req: BookRequest) -> Self {
        BookDraft {
            category_id: req.category_id,
            title: req.title,
            description: req.description,
            content: req.content,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: i64,
    pub owner_id: String,
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            owner_id: book.owner_id,
            category_id: book.category_id,
            title: book.title,
            description: book.description,
            content: book.content,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPageResponse {
    pub items: Vec<BookResponse>,
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl From<BookPage> for BookPageResponse {
    fn from(page: BookPage) -> Self {
        Self {
            items: page.items.into_iter().map(BookResponse::from).collect(),
            page: page.page,
            size: page.size,
            total_items: page.total_items,
            total_pages: page.total_pages,
        }
    }
}

/// `?page=&size=` on the book listing.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}
