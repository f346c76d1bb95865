//! Creates the admin account.
//!
//! Reads `ADMIN_EMAIL`, `ADMIN_PASSWORD` and optionally `ADMIN_USERNAME`
//! (default `admin`). Refuses to run when an admin already exists.

use anyhow::{bail, Context};
use auth_adapters::Argon2Hasher;
use configs::Settings;
use domains::{NewUser, PasswordHasher, UserRepository, UserRole};
use services::forms::{validate_email, validate_password, validate_username};
use storage_adapters::sqlite::SqliteOptions;
use storage_adapters::SqliteStore;

fn required(name: &str) -> anyhow::Result<String> {
    let value = std::env::var(name).with_context(|| format!("{name} must be set"))?;
    Ok(value.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    dotenvy::dotenv().ok();

    let email = required("ADMIN_EMAIL")?;
    let password = required("ADMIN_PASSWORD")?;
    let username = std::env::var("ADMIN_USERNAME").map(|u| u.trim().to_string()).unwrap_or_else(|_| "admin".into());

    validate_email(&email)?;
    validate_password(&password)?;
    validate_username(&username)?;

    let settings = Settings::load().context("loading settings")?;
    if !email.eq_ignore_ascii_case(&settings.auth.admin_email) {
        tracing::warn!(
            configured = %settings.auth.admin_email,
            "ADMIN_EMAIL differs from the configured admin email; admin login will reject it"
        );
    }

    let store = SqliteStore::connect(&SqliteOptions {
        url: settings.database.url.clone(),
        max_connections: 1,
    })
    .await
    .context("opening database")?;

    if let Some(existing) = store.find_admin().await? {
        bail!("an admin already exists: {} <{}>", existing.username, existing.email);
    }

    let admin = UserRepository::create(
        &store,
        NewUser {
            username,
            email,
            password_hash: Some(Argon2Hasher.hash(&password)?),
            google_id: None,
            avatar_url: None,
            role: UserRole::Admin,
        },
    )
    .await?;

    tracing::info!(id = admin.id, username = %admin.username, email = %admin.email, "admin created");
    Ok(())
}
