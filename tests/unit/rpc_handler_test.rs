//! Unit tests for the RPC handler: every JSON method dispatched by `handle_method`.
//!
//! These go through the same code path as the `bookmark-sync-rpc` binary,
//! against an in-memory backend unless a test needs a file.

use serde_json::{json, Value};
use tempfile::TempDir;

use bookmark_sync::app::App;
use bookmark_sync::rpc_handler::handle_method;
use bookmark_sync::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use bookmark_sync::types::settings::{SyncSettings, IN_MEMORY_DATABASE};

fn settings() -> SyncSettings {
    let mut settings = SyncSettings::default();
    settings.backend.database_path = Some(IN_MEMORY_DATABASE.to_string());
    settings.sync.refetch_debounce_ms = 0;
    settings
}

fn config_path(dir: &TempDir) -> String {
    dir.path().join("settings.json").to_string_lossy().to_string()
}

/// App whose settings persist to a file inside `dir`.
async fn configured(dir: &TempDir) -> App {
    let engine = SettingsEngine::new(Some(config_path(dir))).with_settings(settings());
    let mut app = App::with_engine(engine).expect("Failed to init App");
    app.startup().await;
    app
}

async fn started(settings: SyncSettings) -> App {
    let mut app = App::new(settings).expect("Failed to init App");
    app.startup().await;
    app
}

async fn signed_in() -> App {
    let mut app = started(settings()).await;
    handle_method(&mut app, "session.sign_in", &json!({})).await.unwrap();
    app
}

async fn add(app: &mut App, title: &str, url: &str) -> Value {
    handle_method(app, "form.set", &json!({"title": title, "url": url}))
        .await
        .unwrap();
    handle_method(app, "bookmark.save", &json!({})).await.unwrap()
}

fn titles(snapshot: &Value) -> Vec<String> {
    snapshot["state"]["bookmarks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap().to_string())
        .collect()
}

// ─── Basics ───

#[tokio::test]
async fn test_ping() {
    let mut app = started(settings()).await;
    let res = handle_method(&mut app, "ping", &json!({})).await.unwrap();
    assert_eq!(res, json!({"pong": true}));
}

#[tokio::test]
async fn test_unknown_method() {
    let mut app = started(settings()).await;
    let err = handle_method(&mut app, "bookmark.explode", &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err, "unknown method: bookmark.explode");
}

#[tokio::test]
async fn test_settings_get() {
    let mut app = started(settings()).await;
    let res = handle_method(&mut app, "settings.get", &json!({})).await.unwrap();
    assert_eq!(res["backend"]["table"], "bookmarks");
    assert_eq!(res["sync"]["refetch_debounce_ms"], 0);
}

#[tokio::test]
async fn test_state_before_sign_in() {
    let mut app = started(settings()).await;
    let res = handle_method(&mut app, "state", &json!({})).await.unwrap();
    assert_eq!(res["state"]["lifecycle"], "running");
    assert_eq!(res["state"]["session"], Value::Null);
    assert_eq!(res["state"]["panel"], "add");
    assert_eq!(res["alerts"], json!([]));
}

#[tokio::test]
async fn test_settings_set_persists() {
    let dir = TempDir::new().unwrap();
    let mut app = configured(&dir).await;

    let res = handle_method(
        &mut app,
        "settings.set",
        &json!({"key": "sync.refetch_debounce_ms", "value": 250}),
    )
    .await
    .unwrap();
    assert_eq!(res["sync"]["refetch_debounce_ms"], 250);

    let mut reread = SettingsEngine::new(Some(config_path(&dir)));
    assert_eq!(reread.load().unwrap().sync.refetch_debounce_ms, 250);
}

#[tokio::test]
async fn test_settings_set_rejects_bad_requests() {
    let dir = TempDir::new().unwrap();
    let mut app = configured(&dir).await;

    let err = handle_method(&mut app, "settings.set", &json!({"value": 1}))
        .await
        .unwrap_err();
    assert_eq!(err, "missing key");

    let err = handle_method(&mut app, "settings.set", &json!({"key": "sync.debounce"}))
        .await
        .unwrap_err();
    assert_eq!(err, "missing value");

    let err = handle_method(&mut app, "settings.set", &json!({"key": "sync.debounce", "value": 1}))
        .await
        .unwrap_err();
    assert!(err.contains("not found"), "got {}", err);

    let err = handle_method(
        &mut app,
        "settings.set",
        &json!({"key": "sync.refetch_debounce_ms", "value": "soon"}),
    )
    .await
    .unwrap_err();
    assert!(err.contains("Invalid"), "got {}", err);
    assert_eq!(app.settings().sync.refetch_debounce_ms, 0);
}

#[tokio::test]
async fn test_settings_set_account_applies_to_next_sign_in() {
    let dir = TempDir::new().unwrap();
    let mut app = configured(&dir).await;

    handle_method(
        &mut app,
        "settings.set",
        &json!({"key": "auth.accounts.github", "value": "octo"}),
    )
    .await
    .unwrap();

    let res = handle_method(&mut app, "session.sign_in", &json!({"provider": "github"}))
        .await
        .unwrap();
    assert_eq!(res["state"]["session"], "octo");
}

#[tokio::test]
async fn test_settings_reset() {
    let dir = TempDir::new().unwrap();
    let mut app = configured(&dir).await;

    let res = handle_method(&mut app, "settings.reset", &json!({})).await.unwrap();
    assert_eq!(res, serde_json::to_value(SyncSettings::default()).unwrap());

    let mut reread = SettingsEngine::new(Some(config_path(&dir)));
    assert_eq!(reread.load().unwrap(), SyncSettings::default());
}

// ─── Session ───

#[tokio::test]
async fn test_sign_in_uses_default_provider() {
    let mut app = started(settings()).await;
    let res = handle_method(&mut app, "session.sign_in", &json!({})).await.unwrap();
    assert_eq!(res["state"]["session"], "local-user");
}

#[tokio::test]
async fn test_sign_in_unknown_provider_name() {
    let mut app = started(settings()).await;
    let err = handle_method(&mut app, "session.sign_in", &json!({"provider": "myspace"}))
        .await
        .unwrap_err();
    assert!(err.contains("myspace"));
}

#[tokio::test]
async fn test_sign_in_unconfigured_provider_sets_notice() {
    let mut app = started(settings()).await;
    let res = handle_method(&mut app, "session.sign_in", &json!({"provider": "github"}))
        .await
        .unwrap();
    assert_eq!(res["state"]["session"], Value::Null);
    assert_eq!(res["state"]["notice"], "Authentication failed");

    let res = handle_method(&mut app, "notice.dismiss", &json!({})).await.unwrap();
    assert_eq!(res["state"]["notice"], Value::Null);
}

#[tokio::test]
async fn test_sign_out_clears_list() {
    let mut app = signed_in().await;
    add(&mut app, "Docs", "https://docs.example.com").await;

    let res = handle_method(&mut app, "session.sign_out", &json!({})).await.unwrap();
    assert_eq!(res["state"]["session"], Value::Null);
    assert_eq!(res["state"]["bookmarks"], json!([]));
}

// ─── Bookmarks ───

#[tokio::test]
async fn test_save_flow() {
    let mut app = signed_in().await;
    let res = add(&mut app, "Docs", "https://docs.example.com").await;

    assert_eq!(titles(&res), vec!["Docs"]);
    assert_eq!(res["state"]["bookmarks"][0]["user_id"], "local-user");
    assert_eq!(res["state"]["panel"], "list");
    assert_eq!(res["state"]["draft"]["title"], "");
}

#[tokio::test]
async fn test_save_missing_field_reports_on_draft() {
    let mut app = signed_in().await;
    let res = add(&mut app, "Docs", "").await;

    assert_eq!(res["state"]["draft"]["error"], "Please fill all fields");
    assert_eq!(res["state"]["bookmarks"], json!([]));
}

#[tokio::test]
async fn test_edit_then_save_updates() {
    let mut app = signed_in().await;
    let res = add(&mut app, "Docs", "https://docs.example.com").await;
    let id = res["state"]["bookmarks"][0]["id"].as_i64().unwrap();

    let res = handle_method(&mut app, "bookmark.edit", &json!({"id": id})).await.unwrap();
    assert_eq!(res["state"]["panel"], "add");
    assert_eq!(res["state"]["draft"]["editing"]["id"], id);

    let res = add(&mut app, "Documentation", "https://docs.example.com").await;
    assert_eq!(titles(&res), vec!["Documentation"]);
    assert_eq!(res["state"]["bookmarks"][0]["id"], id);
}

#[tokio::test]
async fn test_edit_unknown_id() {
    let mut app = signed_in().await;
    let err = handle_method(&mut app, "bookmark.edit", &json!({"id": 99}))
        .await
        .unwrap_err();
    assert_eq!(err, "unknown bookmark: 99");
}

#[tokio::test]
async fn test_delete_requires_id() {
    let mut app = signed_in().await;
    let err = handle_method(&mut app, "bookmark.delete", &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err, "missing id");
}

#[tokio::test]
async fn test_delete() {
    let mut app = signed_in().await;
    add(&mut app, "Docs", "https://docs.example.com").await;
    let res = add(&mut app, "News", "https://news.example.com").await;
    assert_eq!(titles(&res), vec!["News", "Docs"]);
    let id = res["state"]["bookmarks"][0]["id"].as_i64().unwrap();

    let res = handle_method(&mut app, "bookmark.delete", &json!({"id": id}))
        .await
        .unwrap();
    assert_eq!(titles(&res), vec!["Docs"]);
    assert_eq!(res["alerts"], json!([]));
}

#[tokio::test]
async fn test_refresh_picks_up_external_rows() {
    use bookmark_sync::services::data_store::DataStore;
    use bookmark_sync::types::bookmark::{BookmarkQuery, NewBookmark};
    use bookmark_sync::types::session::UserId;

    let mut app = signed_in().await;
    app.backend
        .store
        .insert(
            "bookmarks",
            NewBookmark {
                title: "Elsewhere".into(),
                url: "https://elsewhere.example.com".into(),
                owner: UserId::new("local-user"),
            },
        )
        .await
        .unwrap();

    let res = handle_method(&mut app, "bookmark.refresh", &json!({})).await.unwrap();
    assert_eq!(titles(&res), vec!["Elsewhere"]);

    let remote = app
        .backend
        .store
        .query("bookmarks", &BookmarkQuery::owned_by(UserId::new("local-user")))
        .await
        .unwrap();
    assert_eq!(remote.len(), 1);
}

// ─── Panels ───

#[tokio::test]
async fn test_panel_switch() {
    let mut app = signed_in().await;
    let res = handle_method(&mut app, "panel.switch", &json!({"panel": "list"}))
        .await
        .unwrap();
    assert_eq!(res["state"]["panel"], "list");

    let err = handle_method(&mut app, "panel.switch", &json!({"panel": "settings"}))
        .await
        .unwrap_err();
    assert_eq!(err, "unknown panel: settings");

    let err = handle_method(&mut app, "panel.switch", &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err, "missing panel");
}

#[tokio::test]
async fn test_panel_cancel_returns_to_list() {
    let mut app = signed_in().await;
    handle_method(&mut app, "form.set", &json!({"title": "half"})).await.unwrap();

    let res = handle_method(&mut app, "panel.cancel", &json!({})).await.unwrap();
    assert_eq!(res["state"]["panel"], "list");
    assert_eq!(res["state"]["draft"]["title"], "");
}

// ─── Persistence ───

#[tokio::test]
async fn test_bookmarks_persist_in_database_file() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let mut file_settings = settings();
    file_settings.backend.database_path = Some(tmp.path().join("bookmarks.db").to_string_lossy().to_string());

    let mut app = started(file_settings.clone()).await;
    handle_method(&mut app, "session.sign_in", &json!({})).await.unwrap();
    add(&mut app, "Docs", "https://docs.example.com").await;
    app.shutdown();
    drop(app);

    let mut app = started(file_settings).await;
    let res = handle_method(&mut app, "session.sign_in", &json!({})).await.unwrap();
    assert_eq!(titles(&res), vec!["Docs"]);
}
