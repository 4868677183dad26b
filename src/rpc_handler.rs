//! RPC method handler for the bookmark sync JSON protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested. `settings.*`
//! methods go to the settings engine and answer with the settings document.
//! Every other method maps onto one controller operation, waits for the
//! controller to settle and answers with the resulting view snapshot plus
//! any alerts raised along the way.

use serde_json::{json, Value};

use crate::app::App;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::bookmark::BookmarkId;
use crate::types::session::AuthProvider;
use crate::types::view::Panel;

fn str_param<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params.get(name).and_then(|v| v.as_str())
}

fn id_param(params: &Value) -> Result<BookmarkId, String> {
    params
        .get("id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| "missing id".to_string())
}

fn settings_json(app: &App) -> Result<Value, String> {
    serde_json::to_value(app.settings()).map_err(|e| e.to_string())
}

/// Account mappings take effect immediately. Every other setting is read
/// when the app starts, so it applies from the next start.
fn apply_account_change(app: &App, key: &str) {
    let Some(provider) = key.strip_prefix("auth.accounts.").and_then(AuthProvider::parse) else {
        return;
    };
    if let Some(user) = app.settings().auth.accounts.get(&provider) {
        app.backend.auth.set_account(provider, user.clone());
    }
}

/// Current view state and drained alerts.
pub fn snapshot(app: &App) -> Result<Value, String> {
    let state = serde_json::to_value(app.controller.state()).map_err(|e| e.to_string())?;
    Ok(json!({ "state": state, "alerts": app.notifier.drain() }))
}

/// Dispatch an RPC method call to the controller.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(app: &mut App, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => return Ok(json!({"pong": true})),
        "settings.get" => return settings_json(app),
        "settings.set" => {
            let key = str_param(params, "key").ok_or("missing key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            app.settings_engine.set_value(key, value).map_err(|e| e.to_string())?;
            apply_account_change(app, key);
            return settings_json(app);
        }
        "settings.reset" => {
            app.settings_engine.reset().map_err(|e| e.to_string())?;
            return settings_json(app);
        }
        "state" => {}

        // ─── Session ───
        "session.sign_in" => {
            let provider = match str_param(params, "provider") {
                Some(name) => AuthProvider::parse(name).ok_or_else(|| format!("unknown provider: {}", name))?,
                None => app.settings().auth.default_provider,
            };
            app.controller.sign_in(provider);
        }
        "session.sign_out" => app.controller.sign_out(),

        // ─── Form ───
        "form.set" => {
            if let Some(title) = str_param(params, "title") {
                app.controller.set_title(title);
            }
            if let Some(url) = str_param(params, "url") {
                app.controller.set_url(url);
            }
        }

        // ─── Bookmarks ───
        "bookmark.save" => app.controller.save(),
        "bookmark.edit" => {
            let id = id_param(params)?;
            let record = app
                .controller
                .state()
                .find(id)
                .cloned()
                .ok_or_else(|| format!("unknown bookmark: {}", id))?;
            app.controller.begin_edit(record);
        }
        "bookmark.delete" => {
            let id = id_param(params)?;
            app.controller.delete(id);
        }
        "bookmark.refresh" => app.controller.refetch_bookmarks(),

        // ─── Panels ───
        "panel.switch" => {
            let name = str_param(params, "panel").ok_or("missing panel")?;
            let panel = Panel::parse(name).ok_or_else(|| format!("unknown panel: {}", name))?;
            app.controller.switch_panel(panel);
        }
        "panel.cancel" => app.controller.cancel_edit(),
        "notice.dismiss" => app.controller.dismiss_notice(),

        _ => return Err(format!("unknown method: {}", method)),
    }

    app.controller.settle().await;
    snapshot(app)
}
