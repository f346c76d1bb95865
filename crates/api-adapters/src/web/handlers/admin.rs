//! Admin data browser. Every route requires [`AdminUser`].

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use domains::DomainError;
use serde_json::{json, Value};

use super::{done, done_with};
use crate::web::error::ApiResult;
use crate::web::extract::AdminUser;
use crate::web::multipart::FormParts;
use crate::web::state::AppState;

pub async fn tables(_: AdminUser, State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "tables": state.admin.list_tables() }))
}

pub async fn records(
    _: AdminUser,
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> ApiResult<Json<Value>> {
    let dump = state.admin.records(&table).await?;
    Ok(Json(json!({ "success": true, "table": table, "columns": dump.columns, "rows": dump.rows })))
}

pub async fn delete_one(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path((table, id)): Path<(String, i64)>,
) -> ApiResult<Json<Value>> {
    let outcome = state.admin.delete_one(&table, id).await?;
    tracing::info!(admin_id = admin.id, %table, id, "record removed through admin browser");
    Ok(done(outcome.message))
}

pub async fn delete_all(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> ApiResult<Json<Value>> {
    let outcome = state.admin.delete_all(&table).await?;
    tracing::info!(admin_id = admin.id, %table, "table cleared through admin browser");
    Ok(done_with(outcome.message, "deleted", outcome.value))
}

pub async fn backup(_: AdminUser, State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let bytes = state.admin.backup().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/vnd.sqlite3"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"backup.sqlite\""),
        ],
        bytes,
    ))
}

/// Multipart field `backup` holding a SQLite database file.
pub async fn restore(
    _: AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut parts = FormParts::read(multipart).await?;
    let upload = parts
        .take_file("backup")
        .ok_or_else(|| DomainError::validation("No backup file provided."))?;

    let outcome = state.admin.restore(upload.data.to_vec()).await?;
    Ok(done(outcome.message))
}
