//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.
//! Every repository write runs in a single transaction; writes that can
//! leave join-table orphans behind return the `SweepReport` of that
//! transaction so the caller can release external media.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::*;

/// Persistence contract for user accounts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_admin(&self) -> Result<Option<User>>;
    async fn create(&self, user: NewUser) -> Result<User>;
    /// Persists the mutable fields (username, password, identity link, avatar, theme).
    async fn save(&self, user: &User) -> Result<()>;
    /// Deletes the user and everything they own, then sweeps.
    /// `removed_images` includes the user's own images and `removed_avatars`
    /// their avatar, if any.
    async fn delete(&self, id: i64) -> Result<SweepReport>;
}

/// Persistence contract for posts, their image associations, and bookmarks.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Newest first. Each tag keeps only posts whose content contains `#tag`.
    async fn list(&self, tags: &[String]) -> Result<Vec<Post>>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>>;
    async fn create(&self, post: NewPost) -> Result<Post>;
    async fn update(&self, id: i64, changes: PostChanges) -> Result<(Post, SweepReport)>;
    async fn delete(&self, id: i64) -> Result<SweepReport>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SavedPostRepository: Send + Sync {
    async fn find(&self, user_id: i64, post_id: i64) -> Result<Option<SavedPost>>;
    async fn add(&self, user_id: i64, post_id: i64) -> Result<SavedPost>;
    async fn remove(&self, user_id: i64, post_id: i64) -> Result<()>;
    /// Bookmarked posts, most recently saved first.
    async fn list_posts(&self, user_id: i64) -> Result<Vec<Post>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>>;
    async fn list_by_post(&self, post_id: i64, order: CommentOrder) -> Result<Vec<Comment>>;
    async fn create(&self, comment: NewComment) -> Result<Comment>;
    async fn update_content(&self, id: i64, content: &str) -> Result<Comment>;
    /// Deletes the comment; a thread root takes its whole thread with it.
    async fn delete(&self, id: i64) -> Result<SweepReport>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VerificationCodeRepository: Send + Sync {
    async fn create(&self, code: NewVerificationCode) -> Result<VerificationCode>;
    async fn find_by_token(&self, token: &str) -> Result<Option<VerificationCode>>;
    async fn mark_valid(&self, id: i64) -> Result<()>;
    /// Sets the user's password hash and deletes the code in one transaction.
    async fn consume(&self, id: i64, user_id: i64, password_hash: &str) -> Result<()>;
    /// Removes every code whose expiry is before `now`, regardless of flag.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Generic access to the allow-listed tables for the admin data browser.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TableRepository: Send + Sync {
    async fn dump(&self, table: AdminTable) -> Result<TableDump>;
    /// `None` when no row has that id.
    async fn delete_one(&self, table: AdminTable, id: i64) -> Result<Option<SweepReport>>;
    /// Deletes every row except admin-role users. Returns the row count.
    async fn delete_all(&self, table: AdminTable) -> Result<(u64, SweepReport)>;
    /// A consistent snapshot of the database file.
    async fn backup(&self) -> Result<Vec<u8>>;
    async fn restore(&self, snapshot: Vec<u8>) -> Result<()>;
}

/// Hosted media contract for uploads and their removal.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn upload(&self, upload: Upload) -> Result<StoredMedia>;
    async fn destroy(&self, public_id: &str) -> Result<()>;
}

/// Transactional mail contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String>;
    /// A malformed stored hash verifies as `false`.
    fn verify(&self, secret: &str, hash: &str) -> bool;
}

/// Source of the random secrets used by the password-reset flow.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CodeGenerator: Send + Sync {
    /// A 4-digit numeric code between 1000 and 9999.
    fn numeric_code(&self) -> String;
    /// An opaque URL-safe lookup token.
    fn lookup_token(&self) -> String;
}

/// Third-party sign-in contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn authorize_url(&self, state: &str) -> String;
    async fn exchange(&self, code: &str) -> Result<FederatedIdentity>;
}
