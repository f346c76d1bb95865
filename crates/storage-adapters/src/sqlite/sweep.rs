//! Post-write consistency pass.
//!
//! Images and posts are linked only through `post_images`, so a foreign-key
//! cascade never reaches across the join table. After every write that can
//! detach an image or drop a comment, this pass removes:
//!
//! 1. images with no remaining `post_images` row,
//! 2. posts with no remaining `post_images` row (their comments and bookmarks
//!    go with them through the owner cascade),
//! 3. comments whose thread root or reply target no longer exists, repeated
//!    until a pass removes nothing.
//!
//! It always runs on the caller's transaction; an error here rolls back the
//! write that triggered it.

use domains::{Image, SweepReport};
use sqlx::SqliteConnection;

use super::rows::{ImageRow, IMAGE_COLUMNS};

pub(crate) async fn sweep(conn: &mut SqliteConnection) -> Result<SweepReport, sqlx::Error> {
    let mut report = SweepReport::default();

    let orphaned_images: Vec<ImageRow> = sqlx::query_as(&format!(
        "SELECT {IMAGE_COLUMNS} FROM images \
         WHERE NOT EXISTS (SELECT 1 FROM post_images pi WHERE pi.image_id = images.id)"
    ))
    .fetch_all(&mut *conn)
    .await?;

    if !orphaned_images.is_empty() {
        sqlx::query(
            "DELETE FROM images \
             WHERE NOT EXISTS (SELECT 1 FROM post_images pi WHERE pi.image_id = images.id)",
        )
        .execute(&mut *conn)
        .await?;
    }
    report.removed_images = orphaned_images.into_iter().map(Image::from).collect();

    // A post deleted earlier in this transaction is already gone here and is
    // never visited twice.
    report.removed_posts = sqlx::query(
        "DELETE FROM posts \
         WHERE NOT EXISTS (SELECT 1 FROM post_images pi WHERE pi.post_id = posts.id)",
    )
    .execute(&mut *conn)
    .await?
    .rows_affected();

    loop {
        let removed = sqlx::query(
            "DELETE FROM comments \
             WHERE (thread_root_id IS NOT NULL AND thread_root_id NOT IN (SELECT id FROM comments)) \
                OR (reply_to_id IS NOT NULL AND reply_to_id NOT IN (SELECT id FROM comments))",
        )
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if removed == 0 {
            break;
        }
        report.removed_comments += removed;
    }

    if !report.is_empty() {
        tracing::debug!(
            images = report.removed_images.len(),
            posts = report.removed_posts,
            comments = report.removed_comments,
            "orphan sweep removed rows"
        );
    }

    Ok(report)
}
