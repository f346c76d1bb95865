//! Axum wiring: routes, guards and middleware.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod multipart;
pub mod rate_limit;
pub mod state;

use std::path::PathBuf;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub use error::{ApiError, ApiResult};
pub use rate_limit::RateLimiter;
pub use state::AppState;

/// Room for a full post: five images plus the text fields.
const BODY_LIMIT: usize = 48 * 1024 * 1024;

/// Where locally stored media is served from.
#[derive(Debug, Clone)]
pub struct MediaMount {
    pub url_prefix: String,
    pub root: PathBuf,
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/admin/login", post(handlers::auth::admin_login))
        .route("/forgot-password", post(handlers::auth::forgot_password))
        .route("/verify-code", post(handlers::auth::verify_code))
        .route("/reset-password", post(handlers::auth::reset_password))
        .route("/google", get(handlers::auth::google_redirect))
        .route("/google/callback", get(handlers::auth::google_callback))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::limit_by_ip))
        .route("/logout", post(handlers::auth::logout))
        .route("/me", get(handlers::auth::me))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/tables", get(handlers::admin::tables))
        .route("/tables/{table}", get(handlers::admin::records).delete(handlers::admin::delete_all))
        .route("/tables/{table}/{id}", delete(handlers::admin::delete_one))
        .route("/backup", get(handlers::admin::backup))
        .route("/restore", post(handlers::admin::restore))
}

fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(state))
        .nest("/admin", admin_routes())
        .route("/posts", get(handlers::posts::list).post(handlers::posts::create))
        .route(
            "/posts/{id}",
            get(handlers::posts::show).put(handlers::posts::edit).delete(handlers::posts::delete),
        )
        .route("/posts/{id}/save", post(handlers::posts::toggle_save))
        .route("/posts/{id}/comments", post(handlers::comments::add))
        .route("/comments/{id}", put(handlers::comments::edit).delete(handlers::comments::delete))
        .route("/saved", get(handlers::posts::saved))
        .route("/settings/profile", put(handlers::settings::update_profile))
        .route("/settings/avatar", delete(handlers::settings::delete_avatar))
        .route("/settings/password", put(handlers::settings::change_password))
        .route("/settings/theme", put(handlers::settings::set_theme))
        .route("/settings/account", delete(handlers::settings::delete_account))
        .route("/contact", post(handlers::public::contact))
}

/// The complete application router.
pub fn router(state: AppState, media: MediaMount) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes(&state))
        .nest_service(&media.url_prefix, ServeDir::new(&media.root))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
