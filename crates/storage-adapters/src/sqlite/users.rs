use async_trait::async_trait;
use chrono::Utc;
use domains::{DomainError, Image, NewUser, Result, SweepReport, User, UserRepository};
use sqlx::SqliteConnection;

use super::rows::{ImageRow, UserRow, IMAGE_COLUMNS, USER_COLUMNS};
use super::sweep::sweep;
use super::{db_error, SqliteStore};

impl SqliteStore {
    async fn fetch_user(&self, filter: &str, value: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE {filter} = ?"))
                .bind(value)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(User::try_from).transpose().map_err(db_error)
    }
}

/// Removes a user and every row they own, in the same order the
/// relationships were declared, then sweeps what that left dangling.
pub(crate) async fn delete_user_tx(
    conn: &mut SqliteConnection,
    id: i64,
) -> std::result::Result<SweepReport, sqlx::Error> {
    let avatar: Option<String> = sqlx::query_scalar("SELECT avatar_public_id FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .flatten();
    let owned_images: Vec<ImageRow> =
        sqlx::query_as(&format!("SELECT {IMAGE_COLUMNS} FROM images WHERE author_id = ?"))
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

    for statement in [
        "DELETE FROM comments WHERE author_id = ?",
        "DELETE FROM images WHERE author_id = ?",
        "DELETE FROM posts WHERE author_id = ?",
        "DELETE FROM saved_posts WHERE user_id = ?",
        "DELETE FROM verification_codes WHERE user_id = ?",
        "DELETE FROM users WHERE id = ?",
    ] {
        sqlx::query(statement).bind(id).execute(&mut *conn).await?;
    }

    let mut report = SweepReport {
        removed_images: owned_images.into_iter().map(Image::from).collect(),
        removed_avatars: avatar.into_iter().collect(),
        ..SweepReport::default()
    };
    report.merge(sweep(conn).await?);
    Ok(report)
}

#[async_trait]
impl UserRepository for SqliteStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(User::try_from).transpose().map_err(db_error)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_user("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.fetch_user("username", username).await
    }

    async fn find_admin(&self) -> Result<Option<User>> {
        self.fetch_user("role", "admin").await
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, google_id, avatar_url, role, theme, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, 'system', ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.google_id)
        .bind(&user.avatar_url)
        .bind(user.role.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?
        .last_insert_rowid();

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::internal("Failed to fetch created user"))
    }

    async fn save(&self, user: &User) -> Result<()> {
        sqlx::query(
            "UPDATE users SET username = ?, email = ?, password_hash = ?, google_id = ?, \
             avatar_url = ?, avatar_public_id = ?, theme = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.google_id)
        .bind(&user.avatar_url)
        .bind(&user.avatar_public_id)
        .bind(user.theme.as_str())
        .bind(Utc::now())
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<SweepReport> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let report = delete_user_tx(&mut *tx, id).await.map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;

        tracing::info!(user_id = id, images = report.removed_images.len(), "user deleted");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{NewImage, NewPost, PostRepository, SavedPostRepository, Theme, UserRole};

    fn new_user(name: &str, role: UserRole) -> NewUser {
        NewUser {
            username: name.into(),
            email: format!("{name}@gmail.com"),
            password_hash: Some("hash".into()),
            google_id: None,
            avatar_url: None,
            role,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = SqliteStore::in_memory().await.unwrap();
        UserRepository::create(&store, new_user("alice", UserRole::User)).await.unwrap();

        let mut twin = new_user("alice", UserRole::User);
        twin.username = "alice2".into();
        let err = UserRepository::create(&store, twin).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn save_persists_profile_changes() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut alice = UserRepository::create(&store, new_user("alice", UserRole::User)).await.unwrap();

        alice.username = "alice.b".into();
        alice.theme = Theme::Dark;
        store.save(&alice).await.unwrap();

        let stored = store.find_by_username("alice.b").await.unwrap().unwrap();
        assert_eq!(stored.id, alice.id);
        assert_eq!(stored.theme, Theme::Dark);
        assert!(store.find_admin().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_takes_owned_rows_and_reports_media() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut alice = UserRepository::create(&store, new_user("alice", UserRole::User)).await.unwrap();
        alice.avatar_url = Some("/media/face".into());
        alice.avatar_public_id = Some("face".into());
        UserRepository::save(&store, &alice).await.unwrap();
        let bob = UserRepository::create(&store, new_user("bob", UserRole::User)).await.unwrap();
        let post = PostRepository::create(
            &store,
            NewPost {
                author_id: alice.id,
                title: None,
                content: "mine".into(),
                images: vec![NewImage { url: "/media/x".into(), public_id: "x".into(), author_id: alice.id }],
            },
        )
        .await
        .unwrap();
        store.add(bob.id, post.id).await.unwrap();

        let report = UserRepository::delete(&store, alice.id).await.unwrap();

        assert_eq!(report.removed_images.iter().map(|i| i.public_id.as_str()).collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(report.removed_avatars, vec!["face".to_string()]);
        assert!(UserRepository::find_by_id(&store, alice.id).await.unwrap().is_none());
        assert!(PostRepository::find_by_id(&store, post.id).await.unwrap().is_none());
        assert!(store.list_posts(bob.id).await.unwrap().is_empty());
    }
}
