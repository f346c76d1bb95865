pub mod admin;
pub mod auth;
pub mod comments;
pub mod posts;
pub mod public;
pub mod settings;

use axum::Json;
use serde_json::{json, Value};

/// `{"success": true, "message": …}`
pub(crate) fn done(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "success": true, "message": message.into() }))
}

/// `{"success": true, "message": …, <key>: <value>}`
pub(crate) fn done_with(message: impl Into<String>, key: &str, value: impl serde::Serialize) -> Json<Value> {
    let mut body = json!({ "success": true, "message": message.into() });
    body[key] = json!(value);
    Json(body)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
