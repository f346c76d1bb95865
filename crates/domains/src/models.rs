//! # Domain Models
//!
//! These structs represent the core entities of the blog.
//! All entities use surrogate `i64` keys assigned by the database.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::System => "system",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Theme::System),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// A credential holder. Federated-only accounts have no password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Subject id from the third-party identity provider
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
    /// Storage-side identifier of the avatar, used for destroy calls
    pub avatar_public_id: Option<String>,
    pub role: UserRole,
    pub theme: Theme,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
    pub role: UserRole,
}

/// Authored content with at least one attached image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Attached images, ordered by creation time
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub author_id: i64,
    pub title: Option<String>,
    pub content: String,
    pub images: Vec<NewImage>,
}

/// An edit applied to an existing post in a single transaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: String,
    /// Image ids whose association with the post is removed
    pub detach_image_ids: Vec<i64>,
    pub attach: Vec<NewImage>,
}

/// A stored-media reference owned by the uploading user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub url: String,
    pub public_id: String,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub url: String,
    pub public_id: String,
    pub author_id: i64,
}

impl NewImage {
    pub fn from_stored(media: StoredMedia, author_id: i64) -> Self {
        Self { url: media.url, public_id: media.public_id, author_id }
    }
}

/// A comment on a post. `thread_root_id` groups a reply chain under its
/// top-level comment while `reply_to_id` keeps the immediate parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub author_id: i64,
    pub post_id: i64,
    pub thread_root_id: Option<i64>,
    pub reply_to_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_thread_root(&self) -> bool {
        self.thread_root_id.is_none()
    }

    /// The root a reply to this comment must be grouped under.
    pub fn thread_root(&self) -> i64 {
        self.thread_root_id.unwrap_or(self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub content: String,
    pub author_id: i64,
    pub post_id: i64,
    pub thread_root_id: Option<i64>,
    pub reply_to_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentOrder {
    #[default]
    Oldest,
    Newest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPost {
    pub user_id: i64,
    pub post_id: i64,
    pub saved_at: DateTime<Utc>,
}

/// A short-lived, single-use password-reset secret. Only the hash of the
/// plaintext code is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationCode {
    pub id: i64,
    pub user_id: i64,
    pub code_hash: String,
    /// Opaque lookup token carried in the verification link
    pub token: String,
    /// Set once the plaintext code has been confirmed
    pub is_valid: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeState {
    Pending,
    Confirmed,
    Expired,
}

impl VerificationCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> CodeState {
        if self.is_expired_at(now) {
            CodeState::Expired
        } else if self.is_valid {
            CodeState::Confirmed
        } else {
            CodeState::Pending
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVerificationCode {
    pub user_id: i64,
    pub code_hash: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// What a write transaction removed beyond the rows it targeted directly.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SweepReport {
    /// Image rows removed; their media still has to be destroyed
    pub removed_images: Vec<Image>,
    /// Avatar public ids of removed users
    pub removed_avatars: Vec<String>,
    pub removed_posts: u64,
    pub removed_comments: u64,
}

impl SweepReport {
    pub fn merge(&mut self, other: SweepReport) {
        self.removed_images.extend(other.removed_images);
        self.removed_avatars.extend(other.removed_avatars);
        self.removed_posts += other.removed_posts;
        self.removed_comments += other.removed_comments;
    }

    pub fn is_empty(&self) -> bool {
        self.removed_images.is_empty()
            && self.removed_avatars.is_empty()
            && self.removed_posts == 0
            && self.removed_comments == 0
    }

    /// Every hosted file the removed rows pointed at.
    pub fn media_ids(&self) -> impl Iterator<Item = &str> {
        self.removed_images
            .iter()
            .map(|i| i.public_id.as_str())
            .chain(self.removed_avatars.iter().map(String::as_str))
    }
}

/// An uploaded file on its way to the media store.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: mime::Mime,
    pub data: Bytes,
}

/// Where the media store put an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMedia {
    pub url: String,
    pub public_id: String,
}

/// Claims received from the third-party identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedIdentity {
    pub subject: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// The fixed allow-list of tables exposed by the admin data browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminTable {
    Users,
    Posts,
    Comments,
    VerificationCodes,
    Images,
    PostImages,
    SavedPosts,
}

impl AdminTable {
    pub const ALL: [AdminTable; 7] = [
        AdminTable::Users,
        AdminTable::Posts,
        AdminTable::Comments,
        AdminTable::VerificationCodes,
        AdminTable::Images,
        AdminTable::PostImages,
        AdminTable::SavedPosts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminTable::Users => "users",
            AdminTable::Posts => "posts",
            AdminTable::Comments => "comments",
            AdminTable::VerificationCodes => "verification_codes",
            AdminTable::Images => "images",
            AdminTable::PostImages => "post_images",
            AdminTable::SavedPosts => "saved_posts",
        }
    }

    /// Pure join tables; single-row deletion is forbidden for these.
    pub fn is_association(&self) -> bool {
        matches!(self, AdminTable::PostImages | AdminTable::SavedPosts)
    }
}

impl FromStr for AdminTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdminTable::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Table '{s}' not found."))
    }
}

impl fmt::Display for AdminTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column names plus every row of one table, for the admin data browser.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TableDump {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}
