//! HTML email bodies.

use askama::Template;
use domains::{DomainError, Result};

#[derive(Template)]
#[template(path = "email/reset_code.html")]
pub(crate) struct ResetCodeEmail<'a> {
    pub code: &'a str,
    pub verification_link: &'a str,
}

#[derive(Template)]
#[template(path = "email/contact_message.html")]
pub(crate) struct ContactEmail<'a> {
    pub sender_email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub inquiry: String,
    pub phone: Option<&'a str>,
    pub message: &'a str,
}

pub(crate) fn render(template: &impl Template) -> Result<String> {
    template
        .render()
        .map_err(|e| DomainError::internal(format!("email template failed to render: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_email_carries_code_and_link() {
        let html = render(&ResetCodeEmail {
            code: "4821",
            verification_link: "https://blog.example/auth/verify-code?token=abc",
        })
        .unwrap();
        assert!(html.contains("4821"));
        assert!(html.contains("verify-code?token=abc"));
    }

    #[test]
    fn contact_email_escapes_user_input() {
        let html = render(&ContactEmail {
            sender_email: "ada@gmail.com",
            first_name: "Ada",
            last_name: "Lovelace",
            inquiry: "Hiring".into(),
            phone: None,
            message: "<script>alert(1)</script>",
        })
        .unwrap();
        assert!(html.contains("ada@gmail.com"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("Phone"));
    }
}
