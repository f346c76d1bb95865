//! # storage-adapters
//!
//! Infrastructure implementations of the domain ports: the SQLite store
//! (every repository, the orphan sweep and the admin table browser), local
//! media storage, and outbound mail.

#[cfg(feature = "db-sqlite")]
pub mod sqlite;

#[cfg(feature = "media-local")]
pub mod media;

pub mod mail;

#[cfg(feature = "db-sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "media-local")]
pub use media::LocalMediaStorage;

pub use mail::LogMailer;

#[cfg(feature = "mail-mailjet")]
pub use mail::MailjetMailer;
