use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domains::DomainError;
use serde_json::json;
use thiserror::Error;

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// No session, or a session that no longer verifies
    #[error("{0}")]
    Unauthorized(String),

    /// Malformed request body the extractors could not turn into a form
    #[error("{0}")]
    BadRequest(String),

    #[error("Too many requests. Please slow down.")]
    TooManyRequests,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn login_required() -> Self {
        Self::Unauthorized("Please log in to access this page.".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(err) => match err {
                DomainError::Validation(_) => StatusCode::BAD_REQUEST,
                DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
                DomainError::Conflict(_) => StatusCode::CONFLICT,
                DomainError::Upstream(_) => StatusCode::BAD_GATEWAY,
                DomainError::Expired(_) => StatusCode::BAD_REQUEST,
                DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Domain(DomainError::Internal(detail)) => {
                tracing::error!(%detail, "request failed");
                "Something went wrong. Please try again.".to_string()
            }
            ApiError::Domain(DomainError::Upstream(msg)) => {
                tracing::warn!(%msg, "upstream service failed");
                msg.clone()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}
