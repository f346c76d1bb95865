//! Session guards. A handler states the access it needs by taking one of
//! these as an argument.

use auth_adapters::TokenError;
use axum::{
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use domains::{DomainError, User};
use secrecy::ExposeSecret;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use super::error::ApiError;
use super::state::AppState;

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn session_user(parts: &Parts, state: &AppState) -> Result<Option<User>, ApiError> {
    let Some(token) = bearer(parts) else {
        return Ok(None);
    };

    let claims = state.sessions.verify(token).map_err(|err| match err {
        TokenError::Expired => ApiError::Unauthorized("Your session has expired. Please log in again.".into()),
        TokenError::Invalid => ApiError::login_required(),
    })?;

    // A deleted account keeps a verifiable token until it expires.
    Ok(state.users.find_by_id(claims.sub).await?)
}

/// Any signed-in account.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        session_user(parts, state).await?.map(CurrentUser).ok_or_else(ApiError::login_required)
    }
}

fn admin_token_matches(presented: Option<&str>, expected: &str) -> bool {
    presented.is_some_and(|t| t.as_bytes().ct_eq(expected.as_bytes()).into())
}

#[derive(Deserialize)]
struct AdminTokenQuery {
    token: Option<String>,
}

/// An admin-role session that also presents the configured admin token.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        let Query(query) = Query::<AdminTokenQuery>::try_from_uri(&parts.uri)
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let token_matches = admin_token_matches(query.token.as_deref(), state.admin_token.expose_secret());

        if !user.is_admin() || !token_matches {
            tracing::warn!(user_id = user.id, "admin area access denied");
            return Err(DomainError::forbidden("Access denied.").into());
        }
        Ok(AdminUser(user))
    }
}

/// Only callers without a live session (register, login, password reset).
#[derive(Debug, Clone, Copy)]
pub struct AnonymousOnly;

impl FromRequestParts<AppState> for AnonymousOnly {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A stale or forged token counts as signed out.
        match session_user(parts, state).await {
            Ok(Some(_)) => Err(DomainError::forbidden("You are already logged in.").into()),
            Ok(None) | Err(ApiError::Unauthorized(_)) => Ok(AnonymousOnly),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::admin_token_matches;

    #[test]
    fn admin_token_must_match_exactly() {
        assert!(admin_token_matches(Some("s3cret-token"), "s3cret-token"));
        assert!(!admin_token_matches(None, "s3cret-token"));
        assert!(!admin_token_matches(Some(""), "s3cret-token"));
        assert!(!admin_token_matches(Some("s3cret"), "s3cret-token"));
        assert!(!admin_token_matches(Some("s3cret-token-and-more"), "s3cret-token"));
    }
}
