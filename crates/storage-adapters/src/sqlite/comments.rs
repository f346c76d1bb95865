use async_trait::async_trait;
use chrono::Utc;
use domains::{
    Comment, CommentOrder, CommentRepository, DomainError, NewComment, Result, SweepReport,
};
use sqlx::SqliteConnection;

use super::rows::{CommentRow, COMMENT_COLUMNS};
use super::sweep::sweep;
use super::{db_error, SqliteStore};

pub(crate) async fn fetch_comment(
    conn: &mut SqliteConnection,
    id: i64,
) -> std::result::Result<Option<Comment>, sqlx::Error> {
    let row: Option<CommentRow> =
        sqlx::query_as(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(Comment::from))
}

/// Deletes a comment. A thread root takes every comment of its thread with
/// it; replies pointing at a deleted reply are left to the sweep.
pub(crate) async fn delete_comment_tx(
    conn: &mut SqliteConnection,
    comment: &Comment,
) -> std::result::Result<SweepReport, sqlx::Error> {
    if comment.is_thread_root() {
        sqlx::query("DELETE FROM comments WHERE thread_root_id = ?")
            .bind(comment.id)
            .execute(&mut *conn)
            .await?;
    }

    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment.id)
        .execute(&mut *conn)
        .await?;

    sweep(conn).await
}

#[async_trait]
impl CommentRepository for SqliteStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        fetch_comment(&mut conn, id).await.map_err(db_error)
    }

    async fn list_by_post(&self, post_id: i64, order: CommentOrder) -> Result<Vec<Comment>> {
        let direction = match order {
            CommentOrder::Oldest => "ASC",
            CommentOrder::Newest => "DESC",
        };

        let rows: Vec<CommentRow> = sqlx::query_as(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ? \
             ORDER BY created_at {direction}, id {direction}"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn create(&self, comment: NewComment) -> Result<Comment> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        let now = Utc::now();

        let id = sqlx::query(
            "INSERT INTO comments (content, author_id, post_id, thread_root_id, reply_to_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&comment.content)
        .bind(comment.author_id)
        .bind(comment.post_id)
        .bind(comment.thread_root_id)
        .bind(comment.reply_to_id)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?
        .last_insert_rowid();

        fetch_comment(&mut conn, id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| DomainError::internal("Failed to fetch created comment"))
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<Comment> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;

        let updated = sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(db_error)?
            .rows_affected();

        if updated == 0 {
            return Err(DomainError::not_found("Comment not found."));
        }

        fetch_comment(&mut conn, id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| DomainError::not_found("Comment not found."))
    }

    async fn delete(&self, id: i64) -> Result<SweepReport> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let comment = fetch_comment(&mut tx, id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| DomainError::not_found("Comment not found."))?;

        let report = delete_comment_tx(&mut tx, &comment).await.map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;

        tracing::debug!(comment_id = id, cascaded = report.removed_comments, "comment deleted");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{NewImage, NewPost, NewUser, PostRepository, UserRepository, UserRole};

    async fn store_with_post() -> (SqliteStore, i64, i64) {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = UserRepository::create(
            &store,
            NewUser {
                username: "reader".into(),
                email: "reader@gmail.com".into(),
                password_hash: None,
                google_id: None,
                avatar_url: None,
                role: UserRole::User,
            },
        )
        .await
        .unwrap();
        let post = PostRepository::create(
            &store,
            NewPost {
                author_id: user.id,
                title: None,
                content: "post".into(),
                images: vec![NewImage { url: "/m/p".into(), public_id: "pimg".into(), author_id: user.id }],
            },
        )
        .await
        .unwrap();
        (store, user.id, post.id)
    }

    async fn add(store: &SqliteStore, author: i64, post: i64, parent: Option<&Comment>) -> Comment {
        CommentRepository::create(
            store,
            NewComment {
                content: "a comment".into(),
                author_id: author,
                post_id: post,
                thread_root_id: parent.map(Comment::thread_root),
                reply_to_id: parent.map(|p| p.id),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn deleting_a_root_removes_the_thread() {
        let (store, author, post) = store_with_post().await;
        let root = add(&store, author, post, None).await;
        let reply = add(&store, author, post, Some(&root)).await;
        let nested = add(&store, author, post, Some(&reply)).await;
        let other = add(&store, author, post, None).await;

        assert_eq!(nested.thread_root_id, Some(root.id));
        assert_eq!(nested.reply_to_id, Some(reply.id));

        CommentRepository::delete(&store, root.id).await.unwrap();

        let left = store.list_by_post(post, CommentOrder::Oldest).await.unwrap();
        assert_eq!(left.iter().map(|c| c.id).collect::<Vec<_>>(), vec![other.id]);
    }

    #[tokio::test]
    async fn deleting_a_reply_sweeps_replies_to_it() {
        let (store, author, post) = store_with_post().await;
        let root = add(&store, author, post, None).await;
        let reply = add(&store, author, post, Some(&root)).await;
        let _nested = add(&store, author, post, Some(&reply)).await;

        let report = CommentRepository::delete(&store, reply.id).await.unwrap();
        assert_eq!(report.removed_comments, 1);

        let left = store.list_by_post(post, CommentOrder::Newest).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, root.id);
    }
}
