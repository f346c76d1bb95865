use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use domains::{
    DomainError, Image, NewImage, NewPost, Post, PostChanges, PostRepository, Result, SweepReport,
};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::rows::{LinkedImageRow, PostRow};
use super::sweep::sweep;
use super::{db_error, SqliteStore};

pub(crate) const POST_COLUMNS: &str = "id, author_id, title, content, created_at, updated_at";

/// Loads the images of every row in one query and assembles the posts,
/// keeping the order of `rows`.
pub(crate) async fn with_images(
    conn: &mut SqliteConnection,
    rows: Vec<PostRow>,
) -> std::result::Result<Vec<Post>, sqlx::Error> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT pi.post_id, i.id, i.url, i.public_id, i.author_id, i.created_at \
         FROM post_images pi JOIN images i ON i.id = pi.image_id WHERE pi.post_id IN (",
    );
    let mut ids = query.separated(", ");
    for row in &rows {
        ids.push_bind(row.id);
    }
    ids.push_unseparated(") ORDER BY i.created_at ASC, i.id ASC");

    let linked: Vec<LinkedImageRow> = query.build_query_as().fetch_all(&mut *conn).await?;

    let mut by_post: HashMap<i64, Vec<Image>> = HashMap::new();
    for link in linked {
        by_post.entry(link.post_id).or_default().push(link.image.into());
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let images = by_post.remove(&row.id).unwrap_or_default();
            row.into_post(images)
        })
        .collect())
}

pub(crate) async fn fetch_post(
    conn: &mut SqliteConnection,
    id: i64,
) -> std::result::Result<Option<Post>, sqlx::Error> {
    let row: Option<PostRow> =
        sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    match row {
        Some(row) => Ok(with_images(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

async fn attach_images(
    conn: &mut SqliteConnection,
    post_id: i64,
    images: &[NewImage],
) -> std::result::Result<(), sqlx::Error> {
    for image in images {
        let image_id = sqlx::query(
            "INSERT INTO images (url, public_id, author_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&image.url)
        .bind(&image.public_id)
        .bind(image.author_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

        sqlx::query("INSERT INTO post_images (post_id, image_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(image_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Deletes a post with its bookmarks, comments and image links. The images
/// themselves are left to the sweep, which reports them.
pub(crate) async fn delete_post_tx(
    conn: &mut SqliteConnection,
    id: i64,
) -> std::result::Result<SweepReport, sqlx::Error> {
    for statement in [
        "DELETE FROM saved_posts WHERE post_id = ?",
        "DELETE FROM comments WHERE post_id = ?",
        "DELETE FROM post_images WHERE post_id = ?",
        "DELETE FROM posts WHERE id = ?",
    ] {
        sqlx::query(statement).bind(id).execute(&mut *conn).await?;
    }

    sweep(conn).await
}

pub(crate) async fn post_exists(
    conn: &mut SqliteConnection,
    id: i64,
) -> std::result::Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

#[async_trait]
impl PostRepository for SqliteStore {
    async fn list(&self, tags: &[String]) -> Result<Vec<Post>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {POST_COLUMNS} FROM posts"));
        for (i, tag) in tags.iter().enumerate() {
            query.push(if i == 0 { " WHERE " } else { " AND " });
            query.push("content LIKE ").push_bind(format!("%#{tag}%"));
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        let rows: Vec<PostRow> =
            query.build_query_as().fetch_all(&mut *conn).await.map_err(db_error)?;

        with_images(&mut conn, rows).await.map_err(db_error)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        fetch_post(&mut conn, id).await.map_err(db_error)
    }

    async fn create(&self, post: NewPost) -> Result<Post> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let now = Utc::now();

        let id = sqlx::query(
            "INSERT INTO posts (author_id, title, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .last_insert_rowid();

        attach_images(&mut tx, id, &post.images).await.map_err(db_error)?;
        sweep(&mut tx).await.map_err(db_error)?;

        let created = fetch_post(&mut tx, id).await.map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;

        // A post created without images is swept in its own transaction.
        created.ok_or_else(|| DomainError::validation("At least one image is required."))
    }

    async fn update(&self, id: i64, changes: PostChanges) -> Result<(Post, SweepReport)> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let updated = sqlx::query("UPDATE posts SET title = ?, content = ?, updated_at = ? WHERE id = ?")
            .bind(&changes.title)
            .bind(&changes.content)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected();

        if updated == 0 {
            return Err(DomainError::not_found("Post not found."));
        }

        for image_id in &changes.detach_image_ids {
            sqlx::query("DELETE FROM post_images WHERE post_id = ? AND image_id = ?")
                .bind(id)
                .bind(image_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        attach_images(&mut tx, id, &changes.attach).await.map_err(db_error)?;
        let report = sweep(&mut tx).await.map_err(db_error)?;

        let post = fetch_post(&mut tx, id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| DomainError::validation("At least one image is required."))?;
        tx.commit().await.map_err(db_error)?;

        Ok((post, report))
    }

    async fn delete(&self, id: i64) -> Result<SweepReport> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        if !post_exists(&mut tx, id).await.map_err(db_error)? {
            return Err(DomainError::not_found("Post not found."));
        }

        let report = delete_post_tx(&mut tx, id).await.map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;

        tracing::info!(post_id = id, images = report.removed_images.len(), "post deleted");
        Ok(report)
    }
}
