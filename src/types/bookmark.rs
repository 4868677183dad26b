use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::UserId;

/// Remote-assigned bookmark identifier.
pub type BookmarkId = i64;

/// A saved bookmark as returned by the data store.
///
/// `id` and `created_at` are assigned remotely and never change once the
/// record exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    pub id: BookmarkId,
    pub title: String,
    pub url: String,
    #[serde(rename = "user_id")]
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// Returns the editable fields of this bookmark.
    pub fn fields(&self) -> BookmarkFields {
        BookmarkFields {
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// The user-editable part of a bookmark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookmarkFields {
    pub title: String,
    pub url: String,
}

impl BookmarkFields {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    /// True when both fields carry a value.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.url.is_empty()
    }
}

/// An insert request: the editable fields plus the owning identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    #[serde(rename = "user_id")]
    pub owner: UserId,
}

impl NewBookmark {
    pub fn new(fields: BookmarkFields, owner: UserId) -> Self {
        Self {
            title: fields.title,
            url: fields.url,
            owner,
        }
    }
}

/// Sort order applied by the data store. Listings are always newest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortOrder {
    CreatedAtDescending,
}

/// Owner-scoped listing query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookmarkQuery {
    pub owner: UserId,
    pub order: SortOrder,
}

impl BookmarkQuery {
    /// Newest-first listing of everything `owner` has saved.
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner,
            order: SortOrder::CreatedAtDescending,
        }
    }
}
