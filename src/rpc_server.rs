//! Bookmark sync RPC server: newline-delimited JSON over stdin/stdout.
//!
//! Request:  {"id":1, "method":"bookmark.save", "params":{}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Change notifications from other writers are handled between requests;
//! the next response reflects them.

use std::io::Write;

use bookmark_sync::app::App;
use bookmark_sync::logging::init_tracing;
use bookmark_sync::rpc_handler::handle_method;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

enum Input {
    Line(std::io::Result<Option<String>>),
    Background,
}

fn emit(value: &Value) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", value);
    let _ = stdout.flush();
}

#[tokio::main]
async fn main() {
    let config_path = std::env::var("BOOKMARK_SYNC_CONFIG").ok();
    let mut app = match App::from_config(config_path) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("failed to initialize bookmark sync: {}", err);
            std::process::exit(1);
        }
    };
    init_tracing(&app.settings().logging.filter);
    app.startup().await;

    emit(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line),
            _ = app.controller.next() => Input::Background,
        };

        let line = match input {
            Input::Background => continue,
            Input::Line(Ok(Some(line))) => line,
            Input::Line(Ok(None)) => break,
            Input::Line(Err(err)) => {
                tracing::error!(%err, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(&json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);
        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&mut app, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        emit(&response);
    }

    app.shutdown();
}
