use async_trait::async_trait;
use domains::{DomainError, Mailer, OutgoingMail, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

const SEND_URL: &str = "https://api.mailjet.com/v3.1/send";

#[derive(Debug, Clone)]
pub struct MailjetConfig {
    pub api_key: SecretString,
    pub secret_key: SecretString,
    pub sender_email: String,
    pub sender_name: String,
}

/// Delivers mail through the Mailjet v3.1 send API.
pub struct MailjetMailer {
    client: reqwest::Client,
    config: MailjetConfig,
}

impl MailjetMailer {
    pub fn new(config: MailjetConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }
}

#[async_trait]
impl Mailer for MailjetMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        let body = json!({
            "Messages": [{
                "From": { "Email": self.config.sender_email, "Name": self.config.sender_name },
                "To": [{ "Email": mail.to }],
                "Subject": mail.subject,
                "HTMLPart": mail.html_body,
            }]
        });

        let response = self
            .client
            .post(SEND_URL)
            .basic_auth(
                self.config.api_key.expose_secret(),
                Some(self.config.secret_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "mail provider unreachable");
                DomainError::upstream("Failed to send email. Please try again later.")
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(%status, %detail, "mail provider rejected message");
            return Err(DomainError::upstream("Failed to send email. Please try again later."));
        }

        tracing::info!(to = %mail.to, "mail sent");
        Ok(())
    }
}
