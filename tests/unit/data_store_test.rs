//! Unit tests for the SQLite-backed data store.
//!
//! These tests exercise the `DataStore` trait against an in-memory database
//! and check that writes reach the attached change feed.

use std::sync::{Arc, Mutex};

use bookmark_sync::database::Database;
use bookmark_sync::services::change_feed::{ChangeFeed, LocalChangeFeed};
use bookmark_sync::services::data_store::{DataStore, SqliteDataStore};
use bookmark_sync::types::bookmark::{BookmarkFields, BookmarkQuery, NewBookmark};
use bookmark_sync::types::change::{ChangeEvent, ChangeFilter, ChangeKind, EventMask};
use bookmark_sync::types::errors::RemoteError;
use bookmark_sync::types::session::UserId;

const TABLE: &str = "bookmarks";

fn setup() -> (SqliteDataStore, Arc<LocalChangeFeed>) {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    let feed = Arc::new(LocalChangeFeed::new());
    (SqliteDataStore::new(db, TABLE).with_feed(feed.clone()), feed)
}

fn new_bookmark(title: &str, owner: &str) -> NewBookmark {
    NewBookmark {
        title: title.to_string(),
        url: format!("https://{}.example.com", title.to_lowercase()),
        owner: UserId::new(owner),
    }
}

fn record_events(feed: &LocalChangeFeed, owner: &str) -> Arc<Mutex<Vec<ChangeEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    feed.subscribe(
        TABLE,
        ChangeFilter::owner(UserId::new(owner)),
        EventMask::All,
        Arc::new(move |event: ChangeEvent| sink.lock().unwrap().push(event)),
    )
    .unwrap();
    seen
}

#[tokio::test]
async fn test_insert_assigns_id_and_timestamp() {
    let (store, _feed) = setup();

    let created = store.insert(TABLE, new_bookmark("Docs", "u1")).await.unwrap();

    assert!(created.id > 0);
    assert_eq!(created.title, "Docs");
    assert_eq!(created.owner, UserId::new("u1"));

    let listed = store
        .query(TABLE, &BookmarkQuery::owned_by(UserId::new("u1")))
        .await
        .unwrap();
    assert_eq!(listed, vec![created]);
}

#[tokio::test]
async fn test_query_is_owner_scoped_and_newest_first() {
    let (store, _feed) = setup();
    let first = store.insert(TABLE, new_bookmark("First", "u1")).await.unwrap();
    let _other = store.insert(TABLE, new_bookmark("Other", "u2")).await.unwrap();
    let second = store.insert(TABLE, new_bookmark("Second", "u1")).await.unwrap();

    let listed = store
        .query(TABLE, &BookmarkQuery::owned_by(UserId::new("u1")))
        .await
        .unwrap();
    let ids: Vec<_> = listed.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_update_and_delete() {
    let (store, _feed) = setup();
    let created = store.insert(TABLE, new_bookmark("Docs", "u1")).await.unwrap();

    store
        .update(TABLE, created.id, BookmarkFields::new("Documentation", "https://docs.example.com"))
        .await
        .unwrap();
    let listed = store
        .query(TABLE, &BookmarkQuery::owned_by(UserId::new("u1")))
        .await
        .unwrap();
    assert_eq!(listed[0].title, "Documentation");
    assert_eq!(listed[0].created_at, created.created_at);

    store.delete(TABLE, created.id).await.unwrap();
    let listed = store
        .query(TABLE, &BookmarkQuery::owned_by(UserId::new("u1")))
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_missing_rows_are_not_errors() {
    let (store, feed) = setup();
    let seen = record_events(&feed, "u1");

    store.delete(TABLE, 404).await.unwrap();
    store
        .update(TABLE, 404, BookmarkFields::new("x", "https://x.io"))
        .await
        .unwrap();

    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_fields_rejected() {
    let (store, _feed) = setup();
    let err = store.insert(TABLE, new_bookmark("", "u1")).await.unwrap_err();
    assert!(matches!(err, RemoteError::Rejected(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_unknown_table_rejected() {
    let (store, _feed) = setup();
    let err = store
        .query("notes", &BookmarkQuery::owned_by(UserId::new("u1")))
        .await
        .unwrap_err();
    assert_eq!(err, RemoteError::UnknownTable("notes".to_string()));
}

#[tokio::test]
async fn test_writes_publish_changes_for_owner_only() {
    let (store, feed) = setup();
    let seen = record_events(&feed, "u1");

    let mine = store.insert(TABLE, new_bookmark("Mine", "u1")).await.unwrap();
    store.insert(TABLE, new_bookmark("Theirs", "u2")).await.unwrap();
    store
        .update(TABLE, mine.id, BookmarkFields::new("Mine!", "https://mine.io"))
        .await
        .unwrap();
    store.delete(TABLE, mine.id).await.unwrap();

    let kinds: Vec<_> = seen.lock().unwrap().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]);
}

#[tokio::test]
async fn test_overlapping_writes_apply_in_call_order() {
    let (store, _feed) = setup();
    let created = store.insert(TABLE, new_bookmark("Docs", "u1")).await.unwrap();

    let (first, second) = tokio::join!(
        store.update(TABLE, created.id, BookmarkFields::new("First", "https://first.io")),
        store.update(TABLE, created.id, BookmarkFields::new("Second", "https://second.io")),
    );
    first.unwrap();
    second.unwrap();

    let listed = store
        .query(TABLE, &BookmarkQuery::owned_by(UserId::new("u1")))
        .await
        .unwrap();
    assert_eq!(listed[0].title, "Second");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_inserts_from_worker_threads() {
    let (store, feed) = setup();
    let store = Arc::new(store);
    let seen = record_events(&feed, "u1");

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.insert(TABLE, new_bookmark(&format!("Item{}", i), "u1")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let listed = store
        .query(TABLE, &BookmarkQuery::owned_by(UserId::new("u1")))
        .await
        .unwrap();
    assert_eq!(listed.len(), 16);
    assert_eq!(seen.lock().unwrap().len(), 16);
}
