use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::Value;
use services::forms::{ChangePasswordForm, ProfileForm, ThemeForm};

use super::{done, done_with};
use crate::web::error::ApiResult;
use crate::web::extract::CurrentUser;
use crate::web::multipart::FormParts;
use crate::web::state::AppState;

/// Multipart fields: optional `username` and optional `avatar` file.
pub async fn update_profile(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut parts = FormParts::read(multipart).await?;
    let form = ProfileForm { username: parts.text("username") }.validate()?;
    let avatar = parts.take_file("avatar");

    let outcome = state.settings.update_profile(user, form, avatar).await?;
    Ok(done_with(outcome.message, "user", outcome.value))
}

pub async fn delete_avatar(CurrentUser(user): CurrentUser, State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let outcome = state.settings.delete_avatar(user).await?;
    Ok(done_with(outcome.message, "user", outcome.value))
}

pub async fn change_password(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(form): Json<ChangePasswordForm>,
) -> ApiResult<Json<Value>> {
    let outcome = state.settings.change_password(user, form.validate()?).await?;
    Ok(done(outcome.message))
}

pub async fn set_theme(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(form): Json<ThemeForm>,
) -> ApiResult<Json<Value>> {
    let outcome = state.settings.set_theme(user, form.theme).await?;
    Ok(done_with(outcome.message, "theme", outcome.value))
}

pub async fn delete_account(CurrentUser(user): CurrentUser, State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let outcome = state.settings.delete_account(&user).await?;
    Ok(done(outcome.message))
}
