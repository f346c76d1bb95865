use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use services::forms::CommentForm;

use super::{done, done_with};
use crate::web::error::ApiResult;
use crate::web::extract::CurrentUser;
use crate::web::state::AppState;

pub async fn add(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(form): Json<CommentForm>,
) -> ApiResult<Json<Value>> {
    let outcome = state.comments.add(&user, post_id, form.validate()?).await?;
    Ok(done_with(outcome.message, "comment", outcome.value))
}

#[derive(Debug, Deserialize)]
pub struct EditComment {
    #[serde(default)]
    content: String,
}

pub async fn edit(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
    Json(body): Json<EditComment>,
) -> ApiResult<Json<Value>> {
    let outcome = state.comments.edit(&user, comment_id, &body.content).await?;
    Ok(done_with(outcome.message, "comment", outcome.value))
}

pub async fn delete(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let outcome = state.comments.delete(&user, comment_id).await?;
    Ok(done(outcome.message))
}
