use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use domains::CommentOrder;
use serde::Deserialize;
use serde_json::{json, Value};
use services::forms::PostForm;

use super::{done, done_with};
use crate::web::error::ApiResult;
use crate::web::extract::CurrentUser;
use crate::web::multipart::FormParts;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Comma-separated, with or without the leading `#`
    #[serde(default)]
    tags: Option<String>,
}

pub(crate) fn parse_tags(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|t| t.trim().trim_start_matches('#'))
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

pub async fn list(State(state): State<AppState>, Query(params): Query<ListParams>) -> ApiResult<Json<Value>> {
    let tags = parse_tags(params.tags.as_deref());
    let posts = state.public.home(&tags).await?;
    Ok(Json(json!({ "success": true, "tags": tags, "posts": posts })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ShowParams {
    #[serde(default)]
    order: Option<String>,
}

pub async fn show(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Query(params): Query<ShowParams>,
) -> ApiResult<Json<Value>> {
    let order = match params.order.as_deref() {
        Some("newest") => CommentOrder::Newest,
        _ => CommentOrder::Oldest,
    };
    let post = state.posts.get(post_id).await?;
    let comments = state.comments.list(post_id, order).await?;
    Ok(Json(json!({ "success": true, "post": post, "comments": comments })))
}

fn post_form(parts: &FormParts) -> PostForm {
    PostForm { title: parts.text("title"), content: parts.text("content").unwrap_or_default() }
}

/// Multipart fields: `title`, `content`, and one or more `images` files.
pub async fn create(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut parts = FormParts::read(multipart).await?;
    let form = post_form(&parts).validate()?;
    let images = parts.take_files("images");

    let outcome = state.posts.create(&user, form, images).await?;
    Ok(done_with(outcome.message, "post", outcome.value))
}

/// As [`create`], plus `removed_images` with the ids to detach.
pub async fn edit(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut parts = FormParts::read(multipart).await?;
    let form = post_form(&parts).validate()?;
    let removed = parts.ids("removed_images")?;
    let images = parts.take_files("images");

    let outcome = state.posts.edit(&user, post_id, form, removed, images).await?;
    Ok(done_with(outcome.message, "post", outcome.value))
}

pub async fn delete(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let outcome = state.posts.delete(&user, post_id).await?;
    Ok(done(outcome.message))
}

pub async fn toggle_save(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let outcome = state.posts.toggle_save(&user, post_id).await?;
    Ok(done_with(outcome.message, "saved", outcome.value))
}

pub async fn saved(CurrentUser(user): CurrentUser, State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let posts = state.posts.list_saved(&user).await?;
    Ok(Json(json!({ "success": true, "posts": posts })))
}

#[cfg(test)]
mod tests {
    use super::parse_tags;

    #[test]
    fn tags_are_split_and_unprefixed() {
        assert_eq!(parse_tags(Some("#rust, travel,,#")), vec!["rust", "travel"]);
        assert!(parse_tags(None).is_empty());
    }
}
