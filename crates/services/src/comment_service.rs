use std::sync::Arc;

use domains::{
    Comment, CommentOrder, CommentRepository, DomainError, NewComment, Outcome, PostRepository,
    Result, User,
};

use crate::forms::CommentForm;

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

fn comment_not_found() -> DomainError {
    DomainError::not_found("Comment not found.")
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { comments, posts }
    }

    pub async fn list(&self, post_id: i64, order: CommentOrder) -> Result<Vec<Comment>> {
        self.comments.list_by_post(post_id, order).await
    }

    /// Adds a root comment, or a reply grouped under the parent's thread root.
    pub async fn add(&self, author: &User, post_id: i64, form: CommentForm) -> Result<Outcome<Comment>> {
        if form.content.trim().is_empty() {
            return Err(DomainError::validation("Comment cannot be empty."));
        }
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(DomainError::not_found("Post not found."));
        }

        let (thread_root_id, reply_to_id) = match form.reply_to {
            Some(parent_id) => {
                let parent = self
                    .comments
                    .find_by_id(parent_id)
                    .await?
                    .filter(|p| p.post_id == post_id)
                    .ok_or_else(|| DomainError::not_found("Parent comment not found."))?;
                (Some(parent.thread_root()), Some(parent.id))
            }
            None => (None, None),
        };

        let comment = self
            .comments
            .create(NewComment {
                content: form.content.trim().to_string(),
                author_id: author.id,
                post_id,
                thread_root_id,
                reply_to_id,
            })
            .await?;

        let message = if reply_to_id.is_some() { "Reply posted." } else { "Comment posted." };
        Ok(Outcome::new(comment, message))
    }

    pub async fn edit(&self, actor: &User, comment_id: i64, content: &str) -> Result<Outcome<Comment>> {
        let comment = self.comments.find_by_id(comment_id).await?.ok_or_else(comment_not_found)?;
        if comment.author_id != actor.id {
            return Err(DomainError::forbidden("Cannot edit others' comments."));
        }

        let content = content.trim();
        if content.is_empty() {
            return Err(DomainError::validation("Comment cannot be empty."));
        }

        let updated = self.comments.update_content(comment_id, content).await?;
        Ok(Outcome::new(updated, "Comment edited successfully."))
    }

    /// The author or an admin may delete. Deleting a thread root removes the thread.
    pub async fn delete(&self, actor: &User, comment_id: i64) -> Result<Outcome> {
        let comment = self.comments.find_by_id(comment_id).await?.ok_or_else(comment_not_found)?;
        if comment.author_id != actor.id && !actor.is_admin() {
            return Err(DomainError::forbidden("Not authorized to delete."));
        }

        let report = self.comments.delete(comment_id).await?;
        tracing::debug!(comment_id, swept = report.removed_comments, "comment removed");

        Ok(Outcome::message("Comment deleted."))
    }
}
