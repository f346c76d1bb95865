//! # configs
//!
//! Runtime settings, layered as built-in defaults → `.env` → environment.
//! Every key can be overridden as `BLOG__<SECTION>__<KEY>`, for example
//! `BLOG__SERVER__PORT=9000` or `BLOG__AUTH__SECRET_KEY=...`.

use std::collections::HashMap;

use config::{Config, Environment};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

const ENV_PREFIX: &str = "BLOG";
const ENV_SEPARATOR: &str = "__";
const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub media: MediaSettings,
    pub mail: MailSettings,
    #[serde(default)]
    pub google: GoogleSettings,
    pub log: LogSettings,
    /// Base of links sent by email, e.g. `https://blog.example.com`
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing key for session and OAuth state tokens
    pub secret_key: SecretString,
    /// Query-string token that unlocks the admin data browser
    pub admin_token: SecretString,
    pub admin_email: String,
    pub session_ttl_hours: i64,
    pub code_ttl_secs: i64,
    pub sweep_interval_secs: u64,
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    pub root: String,
    pub url_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailSettings {
    pub sender_email: String,
    pub sender_name: String,
    pub api_key: Option<SecretString>,
    pub api_secret: Option<SecretString>,
}

impl MailSettings {
    /// Both Mailjet credentials, or `None` when mail should only be logged.
    pub fn credentials(&self) -> Option<(SecretString, SecretString)> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => Some((key.clone(), secret.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub redirect_url: Option<String>,
}

impl GoogleSettings {
    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.redirect_url.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub format: LogFormat,
}

impl Settings {
    /// Reads `.env` if present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!(error = %err, "ignoring unreadable .env"),
        }
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    /// Builds settings from an explicit variable map instead of the process
    /// environment. Keys use the same `BLOG__SECTION__KEY` form.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn from_environment(env: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://blog.db")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.session_ttl_hours", 24)?
            .set_default("auth.code_ttl_secs", 120)?
            .set_default("auth.sweep_interval_secs", 120)?
            .set_default("auth.rate_limit_per_minute", 30)?
            .set_default("media.root", "./data/media")?
            .set_default("media.url_prefix", "/media")?
            .set_default("mail.sender_email", "no-reply@localhost")?
            .set_default("mail.sender_name", "Blog")?
            .set_default("log.format", "pretty")?
            .set_default("public_base_url", "http://localhost:8080")?
            .add_source(
                env.prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, secret) in [("auth.secret_key", &self.auth.secret_key), ("auth.admin_token", &self.auth.admin_token)] {
            if secret.expose_secret().len() < MIN_SECRET_LEN {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("must be at least {MIN_SECRET_LEN} characters"),
                });
            }
        }
        if !self.auth.admin_email.contains('@') {
            return Err(ConfigError::Invalid { key: "auth.admin_email", reason: "not an email address".into() });
        }
        if !self.media.url_prefix.starts_with('/') || self.media.url_prefix.len() < 2 {
            return Err(ConfigError::Invalid {
                key: "media.url_prefix",
                reason: "must be an absolute path such as /media".into(),
            });
        }
        if self.auth.code_ttl_secs <= 0 || self.auth.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "auth.code_ttl_secs",
                reason: "code ttl and sweep interval must be positive".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(extra: &[(&str, &str)]) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = [
            ("BLOG__AUTH__SECRET_KEY", "0123456789abcdef0123456789abcdef"),
            ("BLOG__AUTH__ADMIN_TOKEN", "admin-token-0123456789"),
            ("BLOG__AUTH__ADMIN_EMAIL", "admin@gmail.com"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        vars
    }

    #[test]
    fn defaults_fill_everything_but_secrets() {
        let settings = Settings::from_vars(vars(&[])).unwrap();
        assert_eq!(settings.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(settings.auth.code_ttl_secs, 120);
        assert_eq!(settings.auth.rate_limit_per_minute, 30);
        assert_eq!(settings.media.url_prefix, "/media");
        assert_eq!(settings.log.format, LogFormat::Pretty);
        assert!(settings.mail.credentials().is_none());
        assert!(!settings.google.is_configured());
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::from_vars(vars(&[
            ("BLOG__SERVER__PORT", "9000"),
            ("BLOG__LOG__FORMAT", "json"),
            ("BLOG__MAIL__API_KEY", "key"),
            ("BLOG__MAIL__API_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.log.format, LogFormat::Json);
        assert!(settings.mail.credentials().is_some());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let mut without_secret = vars(&[]);
        without_secret.remove("BLOG__AUTH__SECRET_KEY");
        assert!(matches!(Settings::from_vars(without_secret), Err(ConfigError::Load(_))));
    }

    #[test]
    fn short_secret_is_rejected() {
        let err = Settings::from_vars(vars(&[("BLOG__AUTH__SECRET_KEY", "short")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "auth.secret_key", .. }));
    }
}
