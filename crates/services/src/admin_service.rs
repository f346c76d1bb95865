//! Admin data browser: table listing, row removal, and whole-database
//! backup and restore. Callers must already hold an admin session.

use std::sync::Arc;

use domains::{AdminTable, DomainError, MediaStorage, Outcome, Result, TableDump, TableRepository};

use crate::media::release;

pub struct AdminService {
    tables: Arc<dyn TableRepository>,
    media: Arc<dyn MediaStorage>,
}

fn parse_table(name: &str) -> Result<AdminTable> {
    name.parse::<AdminTable>().map_err(DomainError::not_found)
}

impl AdminService {
    pub fn new(tables: Arc<dyn TableRepository>, media: Arc<dyn MediaStorage>) -> Self {
        Self { tables, media }
    }

    pub fn list_tables(&self) -> Vec<&'static str> {
        AdminTable::ALL.iter().map(AdminTable::as_str).collect()
    }

    pub async fn records(&self, table: &str) -> Result<TableDump> {
        self.tables.dump(parse_table(table)?).await
    }

    pub async fn delete_one(&self, table: &str, id: i64) -> Result<Outcome> {
        let table = parse_table(table)?;
        if table.is_association() {
            return Err(DomainError::forbidden("Deletion forbidden for this table."));
        }

        let report = self
            .tables
            .delete_one(table, id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Record {id} not found.")))?;
        release(self.media.as_ref(), report.media_ids()).await;

        tracing::info!(%table, id, "admin deleted record");
        Ok(Outcome::message(format!("Record {id} deleted from {table}.")))
    }

    /// Admin-role users survive a bulk delete of `users`.
    pub async fn delete_all(&self, table: &str) -> Result<Outcome<u64>> {
        let table = parse_table(table)?;
        let (count, report) = self.tables.delete_all(table).await?;
        release(self.media.as_ref(), report.media_ids()).await;

        tracing::info!(%table, count, "admin cleared table");
        Ok(Outcome::new(count, format!("Deleted {count} records.")))
    }

    pub async fn backup(&self) -> Result<Vec<u8>> {
        self.tables.backup().await
    }

    pub async fn restore(&self, snapshot: Vec<u8>) -> Result<Outcome> {
        if snapshot.is_empty() {
            return Err(DomainError::validation("No backup file provided."));
        }
        self.tables.restore(snapshot).await?;
        tracing::warn!("database restored from uploaded backup");
        Ok(Outcome::message("Database restored."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{Image, MockMediaStorage, MockTableRepository, SweepReport};
    use mockall::predicate::eq;

    fn service(tables: MockTableRepository, media: MockMediaStorage) -> AdminService {
        AdminService::new(Arc::new(tables), Arc::new(media))
    }

    #[test]
    fn lists_the_allow_list() {
        let svc = service(MockTableRepository::new(), MockMediaStorage::new());
        let tables = svc.list_tables();
        assert_eq!(tables.len(), 7);
        assert!(tables.contains(&"verification_codes"));
    }

    #[tokio::test]
    async fn unknown_table_is_not_found() {
        let svc = service(MockTableRepository::new(), MockMediaStorage::new());
        let err = svc.records("sqlite_master").await.unwrap_err();
        assert_eq!(err, DomainError::not_found("Table 'sqlite_master' not found."));
    }

    #[tokio::test]
    async fn association_rows_cannot_be_deleted_one_by_one() {
        let mut tables = MockTableRepository::new();
        tables.expect_delete_one().never();

        let err = service(tables, MockMediaStorage::new())
            .delete_one("saved_posts", 1)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::forbidden("Deletion forbidden for this table."));
    }

    #[tokio::test]
    async fn missing_record() {
        let mut tables = MockTableRepository::new();
        tables.expect_delete_one().returning(|_, _| Ok(None));

        let err = service(tables, MockMediaStorage::new()).delete_one("posts", 42).await.unwrap_err();
        assert_eq!(err, DomainError::not_found("Record 42 not found."));
    }

    #[tokio::test]
    async fn deleting_an_image_row_destroys_its_media() {
        let mut tables = MockTableRepository::new();
        tables.expect_delete_one().with(eq(AdminTable::Images), eq(3i64)).returning(|_, id| {
            Ok(Some(SweepReport {
                removed_images: vec![Image {
                    id,
                    url: "/media/x.png".into(),
                    public_id: "x.png".into(),
                    author_id: 1,
                    created_at: Utc::now(),
                }],
                removed_posts: 1,
                ..Default::default()
            }))
        });
        let mut media = MockMediaStorage::new();
        media.expect_destroy().with(eq("x.png")).times(1).returning(|_| Ok(()));

        let outcome = service(tables, media).delete_one("images", 3).await.unwrap();
        assert_eq!(outcome.message, "Record 3 deleted from images.");
    }

    #[tokio::test]
    async fn deleting_a_user_destroys_their_avatar() {
        let mut tables = MockTableRepository::new();
        tables.expect_delete_one().with(eq(AdminTable::Users), eq(5i64)).returning(|_, _| {
            Ok(Some(SweepReport { removed_avatars: vec!["face.png".into()], ..Default::default() }))
        });
        let mut media = MockMediaStorage::new();
        media.expect_destroy().with(eq("face.png")).times(1).returning(|_| Ok(()));

        service(tables, media).delete_one("users", 5).await.unwrap();
    }

    #[tokio::test]
    async fn delete_all_reports_the_count() {
        let mut tables = MockTableRepository::new();
        tables.expect_delete_all().returning(|_| Ok((4, SweepReport::default())));

        let outcome = service(tables, MockMediaStorage::new()).delete_all("comments").await.unwrap();
        assert_eq!(outcome.value, 4);
        assert_eq!(outcome.message, "Deleted 4 records.");
    }

    #[tokio::test]
    async fn empty_restore_is_rejected() {
        let mut tables = MockTableRepository::new();
        tables.expect_restore().never();

        let err = service(tables, MockMediaStorage::new()).restore(vec![]).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
