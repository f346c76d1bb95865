//! Post authoring with image attachments, and bookmarks.

use std::sync::Arc;

use domains::{
    DomainError, MediaStorage, NewImage, NewPost, Outcome, Post, PostChanges, PostRepository,
    Result, SavedPostRepository, Upload, User,
};

use crate::forms::PostForm;
use crate::media::{release, store_all};

pub const MAX_IMAGES: usize = 5;

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    saved: Arc<dyn SavedPostRepository>,
    media: Arc<dyn MediaStorage>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        saved: Arc<dyn SavedPostRepository>,
        media: Arc<dyn MediaStorage>,
    ) -> Self {
        Self { posts, saved, media }
    }

    pub async fn list(&self, tags: &[String]) -> Result<Vec<Post>> {
        self.posts.list(tags).await
    }

    pub async fn get(&self, id: i64) -> Result<Post> {
        self.posts.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("Post not found."))
    }

    pub async fn create(&self, author: &User, form: PostForm, uploads: Vec<Upload>) -> Result<Outcome<Post>> {
        if uploads.is_empty() {
            return Err(DomainError::validation("At least one image is required."));
        }
        if uploads.len() > MAX_IMAGES {
            return Err(DomainError::validation(format!(
                "You can upload a maximum of {MAX_IMAGES} images."
            )));
        }

        let stored = store_all(self.media.as_ref(), uploads).await?;
        let images = stored.iter().cloned().map(|m| NewImage::from_stored(m, author.id)).collect();

        let created = self
            .posts
            .create(NewPost { author_id: author.id, title: form.title, content: form.content, images })
            .await;

        match created {
            Ok(post) => {
                tracing::info!(post_id = post.id, author_id = author.id, "post created");
                Ok(Outcome::new(post, "Post created successfully!"))
            }
            Err(err) => {
                release(self.media.as_ref(), stored.iter().map(|m| m.public_id.as_str()).collect::<Vec<_>>()).await;
                Err(err)
            }
        }
    }

    pub async fn edit(
        &self,
        actor: &User,
        post_id: i64,
        form: PostForm,
        detach_image_ids: Vec<i64>,
        uploads: Vec<Upload>,
    ) -> Result<Outcome<Post>> {
        let post = self.get(post_id).await?;
        if post.author_id != actor.id {
            return Err(DomainError::forbidden("You can only edit your own posts."));
        }

        let remaining = post.images.iter().filter(|i| !detach_image_ids.contains(&i.id)).count();
        if remaining == 0 && uploads.is_empty() {
            return Err(DomainError::validation("At least one image is required."));
        }
        if remaining + uploads.len() > MAX_IMAGES {
            return Err(DomainError::validation(format!("At most {MAX_IMAGES} images are allowed.")));
        }

        let stored = store_all(self.media.as_ref(), uploads).await?;
        let changes = PostChanges {
            title: form.title,
            content: form.content,
            detach_image_ids,
            attach: stored.iter().cloned().map(|m| NewImage::from_stored(m, actor.id)).collect(),
        };

        match self.posts.update(post_id, changes).await {
            Ok((post, report)) => {
                release(self.media.as_ref(), report.media_ids()).await;
                Ok(Outcome::new(post, "Post edited successfully!"))
            }
            Err(err) => {
                release(self.media.as_ref(), stored.iter().map(|m| m.public_id.as_str()).collect::<Vec<_>>()).await;
                Err(err)
            }
        }
    }

    /// The author or an admin may delete.
    pub async fn delete(&self, actor: &User, post_id: i64) -> Result<Outcome> {
        let post = self.get(post_id).await?;
        if post.author_id != actor.id && !actor.is_admin() {
            return Err(DomainError::forbidden("Not authorized to delete."));
        }

        let report = self.posts.delete(post_id).await?;
        release(self.media.as_ref(), report.media_ids()).await;

        Ok(Outcome::message(format!("Post {post_id} deleted successfully.")))
    }

    /// Returns whether the post is saved after the toggle.
    pub async fn toggle_save(&self, user: &User, post_id: i64) -> Result<Outcome<bool>> {
        if self.saved.find(user.id, post_id).await?.is_some() {
            self.saved.remove(user.id, post_id).await?;
            return Ok(Outcome::new(false, "Post removed from saved."));
        }

        self.saved.add(user.id, post_id).await?;
        Ok(Outcome::new(true, "Post saved."))
    }

    pub async fn list_saved(&self, user: &User) -> Result<Vec<Post>> {
        self.saved.list_posts(user.id).await
    }
}
