use async_trait::async_trait;
use chrono::Utc;
use domains::{DomainError, Post, Result, SavedPost, SavedPostRepository};

use super::posts::{post_exists, with_images, POST_COLUMNS};
use super::rows::{PostRow, SavedPostRow};
use super::{db_error, SqliteStore};

#[async_trait]
impl SavedPostRepository for SqliteStore {
    async fn find(&self, user_id: i64, post_id: i64) -> Result<Option<SavedPost>> {
        let row: Option<SavedPostRow> = sqlx::query_as(
            "SELECT user_id, post_id, saved_at FROM saved_posts WHERE user_id = ? AND post_id = ?",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(SavedPost::from))
    }

    async fn add(&self, user_id: i64, post_id: i64) -> Result<SavedPost> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        if !post_exists(&mut conn, post_id).await.map_err(db_error)? {
            return Err(DomainError::not_found("Post not found."));
        }

        let row: SavedPostRow = sqlx::query_as(
            "INSERT INTO saved_posts (user_id, post_id, saved_at) VALUES (?, ?, ?) \
             RETURNING user_id, post_id, saved_at",
        )
        .bind(user_id)
        .bind(post_id)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await
        .map_err(db_error)?;

        Ok(row.into())
    }

    async fn remove(&self, user_id: i64, post_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM saved_posts WHERE user_id = ? AND post_id = ?")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn list_posts(&self, user_id: i64) -> Result<Vec<Post>> {
        let columns = POST_COLUMNS
            .split(", ")
            .map(|c| format!("p.{c}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "SELECT {columns} FROM saved_posts s JOIN posts p ON p.id = s.post_id \
             WHERE s.user_id = ? ORDER BY s.saved_at DESC, p.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error)?;

        with_images(&mut conn, rows).await.map_err(db_error)
    }
}
