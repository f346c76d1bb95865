use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::Redirect,
    Json,
};
use domains::{DomainError, IdentityProvider, Outcome, User};
use serde::Deserialize;
use serde_json::{json, Value};
use services::forms::{ForgotPasswordForm, LoginForm, RegisterForm, ResetPasswordForm, VerifyCodeForm};
use std::sync::Arc;

use super::{done, done_with};
use crate::web::error::ApiResult;
use crate::web::extract::{AnonymousOnly, CurrentUser};
use crate::web::state::AppState;

/// Signs the session and renders it with the account.
fn session_reply(state: &AppState, outcome: Outcome<User>) -> ApiResult<Json<Value>> {
    let token = state
        .sessions
        .issue(&outcome.value)
        .map_err(|e| DomainError::internal(format!("session signing failed: {e}")))?;

    Ok(Json(json!({
        "success": true,
        "message": outcome.message,
        "token": token,
        "user": outcome.value,
    })))
}

pub async fn register(
    _: AnonymousOnly,
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> ApiResult<Json<Value>> {
    let outcome = state.auth.register(form.validate()?).await?;
    session_reply(&state, outcome)
}

pub async fn login(
    _: AnonymousOnly,
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> ApiResult<Json<Value>> {
    let outcome = state.auth.login(form.validate()?).await?;
    session_reply(&state, outcome)
}

pub async fn admin_login(
    _: AnonymousOnly,
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> ApiResult<Json<Value>> {
    let outcome = state.auth.admin_login(form.validate()?).await?;
    session_reply(&state, outcome)
}

/// Sessions are stateless; the client drops its token.
pub async fn logout(CurrentUser(user): CurrentUser) -> Json<Value> {
    tracing::debug!(user_id = user.id, "logout");
    done("You have been logged out.")
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "success": true, "user": user }))
}

fn identity_provider(state: &AppState) -> ApiResult<Arc<dyn IdentityProvider>> {
    state
        .identity
        .clone()
        .ok_or_else(|| DomainError::not_found("Google sign-in is not configured.").into())
}

const STATE_COOKIE: &str = "oauth_nonce";
const STATE_COOKIE_ATTRS: &str = "Path=/api/auth/google; HttpOnly; SameSite=Lax";

type SetCookie = [(header::HeaderName, String); 1];

fn state_cookie(nonce: &str, max_age: i64) -> SetCookie {
    [(header::SET_COOKIE, format!("{STATE_COOKIE}={nonce}; Max-Age={max_age}; {STATE_COOKIE_ATTRS}"))]
}

fn state_nonce(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == STATE_COOKIE && !value.is_empty()).then_some(value)
        })
}

/// Starts the provider round trip. The state's nonce is pinned to this
/// browser with a short-lived cookie.
pub async fn google_redirect(_: AnonymousOnly, State(state): State<AppState>) -> ApiResult<(SetCookie, Redirect)> {
    let provider = identity_provider(&state)?;
    let oauth_state = state
        .sessions
        .issue_state()
        .map_err(|e| DomainError::internal(format!("state signing failed: {e}")))?;

    Ok((state_cookie(&oauth_state.nonce, 600), Redirect::to(&provider.authorize_url(&oauth_state.token))))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub async fn google_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> ApiResult<(SetCookie, Json<Value>)> {
    let provider = identity_provider(&state)?;
    let failed = || DomainError::forbidden("Google sign-in failed. Please try again.");

    if let Some(error) = params.error {
        tracing::info!(%error, "google sign-in cancelled");
        return Err(failed().into());
    }
    let oauth_state = params.state.ok_or_else(failed)?;
    let nonce = state_nonce(&headers).ok_or_else(|| {
        tracing::warn!("google callback without a state cookie");
        failed()
    })?;
    if state.sessions.verify_state(&oauth_state, nonce).is_err() {
        tracing::warn!("google callback state rejected");
        return Err(failed().into());
    }
    let code = params.code.ok_or_else(failed)?;

    let identity = provider.exchange(&code).await?;
    let outcome = state.auth.federated_sign_in(identity).await?;
    Ok((state_cookie("", 0), session_reply(&state, outcome)?))
}

pub async fn forgot_password(
    _: AnonymousOnly,
    State(state): State<AppState>,
    Json(form): Json<ForgotPasswordForm>,
) -> ApiResult<Json<Value>> {
    let outcome = state.auth.request_reset(form.validate()?).await?;
    Ok(done_with(outcome.message, "token", outcome.value))
}

pub async fn verify_code(
    _: AnonymousOnly,
    State(state): State<AppState>,
    Json(form): Json<VerifyCodeForm>,
) -> ApiResult<Json<Value>> {
    let outcome = state.auth.confirm_code(form.validate()?).await?;
    Ok(done(outcome.message))
}

pub async fn reset_password(
    _: AnonymousOnly,
    State(state): State<AppState>,
    Json(form): Json<ResetPasswordForm>,
) -> ApiResult<Json<Value>> {
    let outcome = state.auth.reset_password(form.validate()?).await?;
    Ok(done(outcome.message))
}
