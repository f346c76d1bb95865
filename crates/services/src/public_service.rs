use std::sync::Arc;

use domains::{Mailer, Outcome, OutgoingMail, Post, PostRepository, Result, User};

use crate::forms::ContactForm;
use crate::templates::{render, ContactEmail};

pub struct PublicService {
    posts: Arc<dyn PostRepository>,
    mailer: Arc<dyn Mailer>,
    admin_email: String,
}

impl PublicService {
    pub fn new(posts: Arc<dyn PostRepository>, mailer: Arc<dyn Mailer>, admin_email: String) -> Self {
        Self { posts, mailer, admin_email }
    }

    /// The home feed, newest first, narrowed by every `#tag` given.
    pub async fn home(&self, tags: &[String]) -> Result<Vec<Post>> {
        self.posts.list(tags).await
    }

    /// Forwards a contact message to the site admin.
    pub async fn contact(&self, sender: &User, form: ContactForm) -> Result<Outcome> {
        let html_body = render(&ContactEmail {
            sender_email: &sender.email,
            first_name: &form.first_name,
            last_name: &form.last_name,
            inquiry: form.inquiry.to_string(),
            phone: form.phone.as_deref(),
            message: &form.message,
        })?;

        self.mailer
            .send(OutgoingMail {
                to: self.admin_email.clone(),
                subject: format!("New Contact Message from {} {}", form.first_name, form.last_name),
                html_body,
            })
            .await?;

        tracing::info!(user_id = sender.id, inquiry = %form.inquiry, "contact message forwarded");
        Ok(Outcome::message("Your message has been sent successfully!"))
    }
}
