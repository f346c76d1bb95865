//! Row shapes as they come out of SQLite, and their conversion into
//! domain entities.

use chrono::{DateTime, Utc};
use domains::{Comment, Image, Post, SavedPost, User, VerificationCode};

pub(crate) const USER_COLUMNS: &str = "id, username, email, password_hash, google_id, avatar_url, \
     avatar_public_id, role, theme, created_at, updated_at";

pub(crate) const IMAGE_COLUMNS: &str = "id, url, public_id, author_id, created_at";

pub(crate) const COMMENT_COLUMNS: &str =
    "id, content, author_id, post_id, thread_root_id, reply_to_id, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
    pub avatar_public_id: Option<String>,
    pub role: String,
    pub theme: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            google_id: row.google_id,
            avatar_url: row.avatar_url,
            avatar_public_id: row.avatar_public_id,
            role: row.role.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            theme: row.theme.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub id: i64,
    pub author_id: i64,
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostRow {
    pub fn into_post(self, images: Vec<Image>) -> Post {
        Post {
            id: self.id,
            author_id: self.author_id,
            title: self.title,
            content: self.content,
            created_at: self.created_at,
            updated_at: self.updated_at,
            images,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ImageRow {
    pub id: i64,
    pub url: String,
    pub public_id: String,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ImageRow> for Image {
    fn from(row: ImageRow) -> Self {
        Image {
            id: row.id,
            url: row.url,
            public_id: row.public_id,
            author_id: row.author_id,
            created_at: row.created_at,
        }
    }
}

/// An image joined with the post it is attached to.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LinkedImageRow {
    pub post_id: i64,
    #[sqlx(flatten)]
    pub image: ImageRow,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CommentRow {
    pub id: i64,
    pub content: String,
    pub author_id: i64,
    pub post_id: i64,
    pub thread_root_id: Option<i64>,
    pub reply_to_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            content: row.content,
            author_id: row.author_id,
            post_id: row.post_id,
            thread_root_id: row.thread_root_id,
            reply_to_id: row.reply_to_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SavedPostRow {
    pub user_id: i64,
    pub post_id: i64,
    pub saved_at: DateTime<Utc>,
}

impl From<SavedPostRow> for SavedPost {
    fn from(row: SavedPostRow) -> Self {
        SavedPost { user_id: row.user_id, post_id: row.post_id, saved_at: row.saved_at }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VerificationCodeRow {
    pub id: i64,
    pub user_id: i64,
    pub code_hash: String,
    pub token: String,
    pub is_valid: bool,
    pub expires_at: DateTime<Utc>,
}

impl From<VerificationCodeRow> for VerificationCode {
    fn from(row: VerificationCodeRow) -> Self {
        VerificationCode {
            id: row.id,
            user_id: row.user_id,
            code_hash: row.code_hash,
            token: row.token,
            is_valid: row.is_valid,
            expires_at: row.expires_at,
        }
    }
}
