use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    DomainError, NewVerificationCode, Result, VerificationCode, VerificationCodeRepository,
};

use super::rows::VerificationCodeRow;
use super::{db_error, SqliteStore};

const CODE_COLUMNS: &str = "id, user_id, code_hash, token, is_valid, expires_at";

#[async_trait]
impl VerificationCodeRepository for SqliteStore {
    async fn create(&self, code: NewVerificationCode) -> Result<VerificationCode> {
        let row: VerificationCodeRow = sqlx::query_as(&format!(
            "INSERT INTO verification_codes (user_id, code_hash, token, is_valid, expires_at) \
             VALUES (?, ?, ?, 0, ?) RETURNING {CODE_COLUMNS}"
        ))
        .bind(code.user_id)
        .bind(&code.code_hash)
        .bind(&code.token)
        .bind(code.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.into())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<VerificationCode>> {
        let row: Option<VerificationCodeRow> = sqlx::query_as(&format!(
            "SELECT {CODE_COLUMNS} FROM verification_codes WHERE token = ?"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(VerificationCode::from))
    }

    async fn mark_valid(&self, id: i64) -> Result<()> {
        let updated = sqlx::query("UPDATE verification_codes SET is_valid = 1 WHERE id = ? AND is_valid = 0")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();

        if updated == 0 {
            return Err(DomainError::invalid_code());
        }
        Ok(())
    }

    async fn consume(&self, id: i64, user_id: i64, password_hash: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Only a confirmed code can be spent, and only once.
        let deleted = sqlx::query(
            "DELETE FROM verification_codes WHERE id = ? AND user_id = ? AND is_valid = 1",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .rows_affected();

        if deleted == 0 {
            return Err(DomainError::invalid_code());
        }

        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM verification_codes WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domains::{NewUser, UserRepository, UserRole};

    async fn store_with_code(expires_in: Duration) -> (SqliteStore, VerificationCode) {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = UserRepository::create(
            &store,
            NewUser {
                username: "forgetful".into(),
                email: "forgetful@gmail.com".into(),
                password_hash: Some("old".into()),
                google_id: None,
                avatar_url: None,
                role: UserRole::User,
            },
        )
        .await
        .unwrap();
        let code = VerificationCodeRepository::create(
            &store,
            NewVerificationCode {
                user_id: user.id,
                code_hash: "hash".into(),
                token: "tok".into(),
                expires_at: Utc::now() + expires_in,
            },
        )
        .await
        .unwrap();
        (store, code)
    }

    #[tokio::test]
    async fn consume_requires_confirmation_and_runs_once() {
        let (store, code) = store_with_code(Duration::seconds(120)).await;
        assert!(!code.is_valid);

        assert_eq!(
            store.consume(code.id, code.user_id, "new").await.unwrap_err(),
            DomainError::invalid_code()
        );

        store.mark_valid(code.id).await.unwrap();
        store.consume(code.id, code.user_id, "new").await.unwrap();

        let user = UserRepository::find_by_id(&store, code.user_id).await.unwrap().unwrap();
        assert_eq!(user.password_hash.as_deref(), Some("new"));
        assert!(store.find_by_token("tok").await.unwrap().is_none());
        assert!(store.consume(code.id, code.user_id, "again").await.is_err());
    }

    #[tokio::test]
    async fn a_code_is_confirmed_only_once() {
        let (store, code) = store_with_code(Duration::seconds(120)).await;

        store.mark_valid(code.id).await.unwrap();
        assert_eq!(store.mark_valid(code.id).await.unwrap_err(), DomainError::invalid_code());
        assert!(store.find_by_token("tok").await.unwrap().unwrap().is_valid);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_rows() {
        let (store, _) = store_with_code(Duration::seconds(-1)).await;
        assert_eq!(store.delete_expired(Utc::now()).await.unwrap(), 1);
        assert_eq!(store.delete_expired(Utc::now()).await.unwrap(), 0);

        let (store, _) = store_with_code(Duration::seconds(120)).await;
        assert_eq!(store.delete_expired(Utc::now()).await.unwrap(), 0);
    }
}
