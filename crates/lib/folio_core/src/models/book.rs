//! Book domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored book. `owner_id` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub owner_id: String,
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied book fields for create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct BookDraft {
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
}

/// Book about to be inserted; the store assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub owner_id: String,
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
}

/// One page of the public book listing.
#[derive(Debug, Clone, Serialize)]
pub struct BookPage {
    pub items: Vec<Book>,
    /// 1-based page number.
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}
