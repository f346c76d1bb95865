//! Outbound mail adapters.

#[cfg(feature = "mail-mailjet")]
mod mailjet;

#[cfg(feature = "mail-mailjet")]
pub use mailjet::{MailjetConfig, MailjetMailer};

use async_trait::async_trait;
use domains::{Mailer, OutgoingMail, Result};

/// Writes every message to the log instead of delivering it.
/// Used in development and whenever no mail provider is configured.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            body_len = mail.html_body.len(),
            "mail delivery skipped (log mailer)"
        );
        tracing::debug!(body = %mail.html_body, "mail body");
        Ok(())
    }
}
