//! Bookmark sync — console walkthrough.
//!
//! Runs the main flows against an in-memory local backend: sign-in, add,
//! edit, a change from another writer, delete, sign-out.

use bookmark_sync::app::App;
use bookmark_sync::logging::init_tracing;
use bookmark_sync::managers::view_state::ViewState;
use bookmark_sync::services::data_store::DataStore;
use bookmark_sync::types::bookmark::NewBookmark;
use bookmark_sync::types::errors::AppError;
use bookmark_sync::types::session::AuthProvider;
use bookmark_sync::types::settings::{SyncSettings, IN_MEMORY_DATABASE};

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn show(state: &ViewState) {
    match &state.session {
        Some(user) => println!("  Signed in as: {}", user),
        None => println!("  Signed out"),
    }
    println!("  Panel: {:?}", state.panel);
    if let Some(error) = &state.draft.error {
        println!("  Form error: {}", error);
    }
    for b in &state.bookmarks {
        println!("    #{} {} <{}>", b.id, b.title, b.url);
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let mut settings = SyncSettings::default();
    settings.backend.database_path = Some(IN_MEMORY_DATABASE.to_string());
    init_tracing(&settings.logging.filter);

    println!();
    println!("  Bookmark sync v{} — demo mode", env!("CARGO_PKG_VERSION"));
    println!();

    let mut app = App::new(settings)?;
    app.startup().await;

    section("Sign in");
    app.controller.sign_in(AuthProvider::Google);
    app.controller.settle().await;
    show(app.controller.state());

    section("Save with a missing field");
    app.controller.set_title("Docs");
    app.controller.save();
    app.controller.settle().await;
    show(app.controller.state());

    section("Add bookmark");
    app.controller.set_url("https://docs.example.com");
    app.controller.save();
    app.controller.settle().await;
    show(app.controller.state());

    section("Edit bookmark");
    if let Some(record) = app.controller.state().bookmarks.first().cloned() {
        app.controller.begin_edit(record);
        app.controller.set_title("Documentation");
        app.controller.save();
        app.controller.settle().await;
    }
    show(app.controller.state());

    section("Another session adds a bookmark");
    if let Some(owner) = app.controller.state().session.clone() {
        let record = NewBookmark {
            title: "Rust".to_string(),
            url: "https://www.rust-lang.org".to_string(),
            owner,
        };
        app.backend.store.insert(&app.settings().backend.table, record).await?;
        app.controller.settle().await;
    }
    show(app.controller.state());

    section("Delete bookmark");
    if let Some(id) = app.controller.state().bookmarks.last().map(|b| b.id) {
        app.controller.delete(id);
        println!("  Removed locally before the store answered:");
        show(app.controller.state());
        app.controller.settle().await;
    }
    show(app.controller.state());

    section("Sign out");
    app.controller.sign_out();
    app.controller.settle().await;
    show(app.controller.state());

    app.shutdown();
    Ok(())
}
