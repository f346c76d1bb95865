//! Google OAuth 2.0 authorization-code flow.

use async_trait::async_trait;
use domains::{DomainError, FederatedIdentity, IdentityProvider, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    /// Must match the redirect URI registered with Google.
    pub redirect_url: String,
}

pub struct GoogleIdentityProvider {
    client: reqwest::Client,
    config: GoogleConfig,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    email: String,
    #[serde(default)]
    email_verified: bool,
    picture: Option<String>,
}

impl GoogleIdentityProvider {
    pub fn new(config: GoogleConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }
}

fn upstream(err: impl std::fmt::Display) -> DomainError {
    tracing::warn!(error = %err, "google sign-in failed");
    DomainError::upstream("Google sign-in failed. Please try again.")
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorize_url(&self, state: &str) -> String {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("state", state),
        ];
        match reqwest::Url::parse_with_params(AUTHORIZE_URL, &params) {
            Ok(url) => url.into(),
            Err(_) => AUTHORIZE_URL.to_string(),
        }
    }

    async fn exchange(&self, code: &str) -> Result<FederatedIdentity> {
        let token: TokenResponse = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(upstream)?
            .json()
            .await
            .map_err(upstream)?;

        let info: UserInfo = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(upstream)?
            .json()
            .await
            .map_err(upstream)?;

        if !info.email_verified {
            return Err(DomainError::forbidden("Your Google email address is not verified."));
        }

        Ok(FederatedIdentity { subject: info.sub, email: info.email, avatar_url: info.picture })
    }
}
