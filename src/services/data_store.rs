//! Data store contract and the SQLite-backed local implementation.
//!
//! The store is the source of truth; the controller only ever holds a cache
//! of what [`DataStore::query`] returns.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tokio::sync::Mutex;

use crate::database::Database;
use crate::services::change_feed::LocalChangeFeed;
use crate::types::bookmark::{Bookmark, BookmarkFields, BookmarkId, BookmarkQuery, NewBookmark, SortOrder};
use crate::types::change::{ChangeEvent, ChangeKind};
use crate::types::errors::RemoteError;
use crate::types::session::UserId;

/// Trait defining the remote record operations the controller consumes.
///
/// Every call names its table explicitly; listings are scoped by the
/// owner filter in the query, never by ambient session state.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn query(&self, table: &str, query: &BookmarkQuery) -> Result<Vec<Bookmark>, RemoteError>;
    /// Inserts a record and returns it with its assigned id and timestamp.
    async fn insert(&self, table: &str, record: NewBookmark) -> Result<Bookmark, RemoteError>;
    async fn update(&self, table: &str, id: BookmarkId, fields: BookmarkFields) -> Result<(), RemoteError>;
    async fn delete(&self, table: &str, id: BookmarkId) -> Result<(), RemoteError>;
}

/// Local data store over a single SQLite table.
///
/// Statements run on tokio's blocking pool, one at a time and in call
/// order. Updates and deletes that match no row succeed without effect.
/// Every write that does touch a row is published to the attached feed once
/// the statement has returned.
pub struct SqliteDataStore {
    db: Arc<Mutex<Database>>,
    table: String,
    feed: Option<Arc<LocalChangeFeed>>,
}

impl SqliteDataStore {
    pub fn new(db: Database, table: impl Into<String>) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            table: table.into(),
            feed: None,
        }
    }

    /// Publishes every successful write to `feed`.
    pub fn with_feed(mut self, feed: Arc<LocalChangeFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    fn check_table(&self, table: &str) -> Result<(), RemoteError> {
        if table != self.table {
            return Err(RemoteError::UnknownTable(table.to_string()));
        }
        Ok(())
    }

    /// Runs `op` against the connection on the blocking pool. Callers get the
    /// connection in the order they asked for it.
    async fn with_db<T, F>(&self, op: F) -> Result<T, RemoteError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> rusqlite::Result<T> + Send + 'static,
    {
        let db = self.db.clone().lock_owned().await;
        tokio::task::spawn_blocking(move || op(&*db))
            .await
            .map_err(|join_err| RemoteError::Storage(format!("store worker failed: {join_err}")))?
            .map_err(RemoteError::from)
    }

    fn publish(&self, kind: ChangeKind, owner: UserId, record_id: BookmarkId) {
        if let Some(feed) = &self.feed {
            feed.publish(&ChangeEvent {
                table: self.table.clone(),
                kind,
                owner,
                record_id,
            });
        }
    }

    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            owner: UserId::new(row.get::<_, String>(3)?),
            created_at: row.get(4)?,
        })
    }
}

#[async_trait]
impl DataStore for SqliteDataStore {
    async fn query(&self, table: &str, query: &BookmarkQuery) -> Result<Vec<Bookmark>, RemoteError> {
        self.check_table(table)?;
        let sql = match query.order {
            SortOrder::CreatedAtDescending => {
                "SELECT id, title, url, user_id, created_at FROM bookmarks \
                 WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
            }
        };
        let owner = query.owner.as_str().to_string();

        self.with_db(move |db| {
            let mut stmt = db.connection().prepare(sql)?;
            let rows = stmt.query_map(params![owner], Self::row_to_bookmark)?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row?);
            }
            Ok(results)
        })
        .await
    }

    async fn insert(&self, table: &str, record: NewBookmark) -> Result<Bookmark, RemoteError> {
        self.check_table(table)?;
        let created = self
            .with_db(move |db| {
                db.connection().query_row(
                    "INSERT INTO bookmarks (title, url, user_id, created_at) VALUES (?1, ?2, ?3, ?4) \
                     RETURNING id, title, url, user_id, created_at",
                    params![record.title, record.url, record.owner.as_str(), Utc::now()],
                    Self::row_to_bookmark,
                )
            })
            .await?;

        self.publish(ChangeKind::Insert, created.owner.clone(), created.id);
        Ok(created)
    }

    async fn update(&self, table: &str, id: BookmarkId, fields: BookmarkFields) -> Result<(), RemoteError> {
        self.check_table(table)?;
        let owner: Option<String> = self
            .with_db(move |db| {
                db.connection()
                    .query_row(
                        "UPDATE bookmarks SET title = ?1, url = ?2 WHERE id = ?3 RETURNING user_id",
                        params![fields.title, fields.url, id],
                        |row| row.get(0),
                    )
                    .optional()
            })
            .await?;

        match owner {
            Some(owner) => self.publish(ChangeKind::Update, UserId::new(owner), id),
            None => tracing::debug!(id, "update matched no bookmark"),
        }
        Ok(())
    }

    async fn delete(&self, table: &str, id: BookmarkId) -> Result<(), RemoteError> {
        self.check_table(table)?;
        let owner: Option<String> = self
            .with_db(move |db| {
                db.connection()
                    .query_row(
                        "DELETE FROM bookmarks WHERE id = ?1 RETURNING user_id",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()
            })
            .await?;

        match owner {
            Some(owner) => self.publish(ChangeKind::Delete, UserId::new(owner), id),
            None => tracing::debug!(id, "delete matched no bookmark"),
        }
        Ok(())
    }
}
