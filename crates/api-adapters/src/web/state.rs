use std::sync::Arc;

use auth_adapters::JwtSessions;
use domains::{IdentityProvider, UserRepository};
use secrecy::SecretString;
use services::{AdminService, AuthService, CommentService, PostService, PublicService, SettingsService};

use super::rate_limit::RateLimiter;

/// Everything a handler can reach, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub settings: Arc<SettingsService>,
    pub admin: Arc<AdminService>,
    pub public: Arc<PublicService>,
    /// Resolves the session subject to a live account on every request
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<JwtSessions>,
    /// `None` when Google sign-in is not configured
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub limiter: Arc<RateLimiter>,
    /// Second factor for the admin data browser, passed as `?token=`
    pub admin_token: Arc<SecretString>,
}
