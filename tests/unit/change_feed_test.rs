//! Unit tests for the in-process change feed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bookmark_sync::services::change_feed::{ChangeCallback, ChangeFeed, LocalChangeFeed};
use bookmark_sync::types::change::{ChangeEvent, ChangeFilter, ChangeKind, EventMask};
use bookmark_sync::types::session::UserId;

fn event(table: &str, kind: ChangeKind, owner: &str) -> ChangeEvent {
    ChangeEvent {
        table: table.to_string(),
        kind,
        owner: UserId::new(owner),
        record_id: 1,
    }
}

fn counter() -> (Arc<AtomicUsize>, ChangeCallback) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let callback: ChangeCallback = Arc::new(move |_: ChangeEvent| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    (count, callback)
}

#[test]
fn test_filter_by_table_and_owner() {
    let feed = LocalChangeFeed::new();
    let (mine, mine_cb) = counter();
    let (theirs, theirs_cb) = counter();
    feed.subscribe("bookmarks", ChangeFilter::owner(UserId::new("u1")), EventMask::All, mine_cb)
        .unwrap();
    feed.subscribe("bookmarks", ChangeFilter::owner(UserId::new("u2")), EventMask::All, theirs_cb)
        .unwrap();

    assert_eq!(feed.publish(&event("bookmarks", ChangeKind::Insert, "u1")), 1);
    assert_eq!(feed.publish(&event("bookmarks", ChangeKind::Update, "u1")), 1);
    assert_eq!(feed.publish(&event("bookmarks", ChangeKind::Delete, "u2")), 1);
    assert_eq!(feed.publish(&event("bookmarks", ChangeKind::Insert, "u3")), 0);
    assert_eq!(feed.publish(&event("notes", ChangeKind::Insert, "u1")), 0);

    assert_eq!(mine.load(Ordering::SeqCst), 2);
    assert_eq!(theirs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let feed = LocalChangeFeed::new();
    let (count, cb) = counter();
    let handle = feed
        .subscribe("bookmarks", ChangeFilter::owner(UserId::new("u1")), EventMask::All, cb)
        .unwrap();
    assert_eq!(feed.active_channels(), 1);

    feed.unsubscribe(handle);
    feed.unsubscribe(handle);
    assert_eq!(feed.active_channels(), 0);

    feed.publish(&event("bookmarks", ChangeKind::Update, "u1"));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_callback_may_unsubscribe_itself() {
    let feed = Arc::new(LocalChangeFeed::new());
    let slot = Arc::new(std::sync::Mutex::new(None));
    let (f, s) = (feed.clone(), slot.clone());
    let handle = feed
        .subscribe(
            "bookmarks",
            ChangeFilter::owner(UserId::new("u1")),
            EventMask::All,
            Arc::new(move |_: ChangeEvent| {
                if let Some(h) = s.lock().unwrap().take() {
                    f.unsubscribe(h);
                }
            }),
        )
        .unwrap();
    *slot.lock().unwrap() = Some(handle);

    feed.publish(&event("bookmarks", ChangeKind::Insert, "u1"));
    assert_eq!(feed.active_channels(), 0);
}
