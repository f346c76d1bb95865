//! # SQLite store
//!
//! Maps the relational model onto the domain entities. One `SqliteStore`
//! implements every repository port so that cascades and the orphan sweep
//! can share a transaction regardless of which entity started the write.

mod comments;
mod posts;
mod rows;
mod saved_posts;
mod sweep;
mod tables;
mod users;
mod verification_codes;

use std::str::FromStr;
use std::time::Duration;

use domains::DomainError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Connection-level settings for [`SqliteStore::connect`].
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database file and runs pending migrations.
    pub async fn connect(options: &SqliteOptions) -> Result<Self, sqlx::Error> {
        let connect_options = SqliteConnectOptions::from_str(&options.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;

        Self::migrate(&pool).await?;
        tracing::info!(url = %options.url, "database connected and migrated");
        Ok(Self::new(pool))
    }

    /// A private in-memory database on a single pinned connection.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // Every connection to ":memory:" is a separate database, so the pool
        // must never drop or replace its only connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;

        Self::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Maps driver failures onto the domain taxonomy.
pub(crate) fn db_error(err: sqlx::Error) -> DomainError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return DomainError::conflict("A record with the same unique value already exists.");
        }
    }
    tracing::error!(error = %err, "database operation failed");
    DomainError::internal(err.to_string())
}
