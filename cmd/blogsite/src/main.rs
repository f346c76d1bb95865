//! # blogsite
//!
//! Assembles the adapters chosen at compile time behind the service layer
//! and serves the HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::{router, AppState, MediaMount, RateLimiter};
use auth_adapters::{Argon2Hasher, JwtSessions, RandomCodes};
use configs::{LogFormat, Settings};
use domains::{IdentityProvider, Mailer};
use services::{
    maintenance, AdminService, AuthPolicy, AuthService, CommentService, PostService, PublicService,
    SettingsService,
};
use storage_adapters::sqlite::SqliteOptions;
use storage_adapters::{LocalMediaStorage, LogMailer, SqliteStore};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,blogsite=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[cfg(feature = "mail-mailjet")]
fn mailer(settings: &Settings) -> Arc<dyn Mailer> {
    use storage_adapters::mail::{MailjetConfig, MailjetMailer};

    match settings.mail.credentials() {
        Some((api_key, secret_key)) => Arc::new(MailjetMailer::new(MailjetConfig {
            api_key,
            secret_key,
            sender_email: settings.mail.sender_email.clone(),
            sender_name: settings.mail.sender_name.clone(),
        })),
        None => {
            tracing::warn!("mail credentials not set; outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    }
}

#[cfg(not(feature = "mail-mailjet"))]
fn mailer(_settings: &Settings) -> Arc<dyn Mailer> {
    Arc::new(LogMailer)
}

#[cfg(feature = "oauth-google")]
fn identity_provider(settings: &Settings) -> Option<Arc<dyn IdentityProvider>> {
    use auth_adapters::{GoogleConfig, GoogleIdentityProvider};

    let google = &settings.google;
    match (&google.client_id, &google.client_secret, &google.redirect_url) {
        (Some(client_id), Some(client_secret), Some(redirect_url)) => {
            Some(Arc::new(GoogleIdentityProvider::new(GoogleConfig {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                redirect_url: redirect_url.clone(),
            })))
        }
        _ => {
            tracing::info!("google sign-in disabled");
            None
        }
    }
}

#[cfg(not(feature = "oauth-google"))]
fn identity_provider(_settings: &Settings) -> Option<Arc<dyn IdentityProvider>> {
    None
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(settings.log.format);

    // 1. Persistence
    let store = Arc::new(
        SqliteStore::connect(&SqliteOptions {
            url: settings.database.url.clone(),
            max_connections: settings.database.max_connections,
        })
        .await
        .context("opening database")?,
    );

    // 2. Media
    tokio::fs::create_dir_all(&settings.media.root)
        .await
        .with_context(|| format!("creating media root {}", settings.media.root))?;
    let media = Arc::new(LocalMediaStorage::new(&settings.media.root, &settings.media.url_prefix));

    // 3. Auth primitives and outbound services
    let hasher = Arc::new(Argon2Hasher);
    let sessions = Arc::new(JwtSessions::new(
        &settings.auth.secret_key,
        chrono::Duration::hours(settings.auth.session_ttl_hours),
    ));
    let mailer = mailer(&settings);

    // 4. Use cases
    let auth = Arc::new(AuthService::new(
        store.clone(),
        store.clone(),
        hasher.clone(),
        Arc::new(RandomCodes),
        mailer.clone(),
        AuthPolicy {
            admin_email: settings.auth.admin_email.clone(),
            code_ttl: chrono::Duration::seconds(settings.auth.code_ttl_secs),
            public_base_url: settings.public_base_url.clone(),
        },
    ));
    let limiter = Arc::new(RateLimiter::per_minute(settings.auth.rate_limit_per_minute));

    let state = AppState {
        auth: auth.clone(),
        posts: Arc::new(PostService::new(store.clone(), store.clone(), media.clone())),
        comments: Arc::new(CommentService::new(store.clone(), store.clone())),
        settings: Arc::new(SettingsService::new(store.clone(), media.clone(), hasher)),
        admin: Arc::new(AdminService::new(store.clone(), media.clone())),
        public: Arc::new(PublicService::new(store.clone(), mailer, settings.auth.admin_email.clone())),
        users: store.clone(),
        sessions,
        identity: identity_provider(&settings),
        limiter: limiter.clone(),
        admin_token: Arc::new(settings.auth.admin_token.clone()),
    };

    // 5. Background upkeep
    let sweeper = maintenance::spawn_code_sweeper(auth, Duration::from_secs(settings.auth.sweep_interval_secs));
    let pruner = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.prune();
        }
    });

    let app = router(
        state,
        MediaMount { url_prefix: settings.media.url_prefix.clone(), root: settings.media.root.clone().into() },
    );

    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "blogsite listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.abort();
    pruner.abort();
    Ok(())
}
