//! Admin data browser: generic dumps of the allow-listed tables, deletion
//! through the same cascade paths the services use, and whole-database
//! backup and restore.

use async_trait::async_trait;
use domains::{AdminTable, DomainError, Image, Result, SweepReport, TableDump, TableRepository};
use serde_json::{Map, Value};
use sqlx::{Connection, SqliteConnection};

use super::comments::{delete_comment_tx, fetch_comment};
use super::posts::{delete_post_tx, post_exists};
use super::rows::{ImageRow, IMAGE_COLUMNS};
use super::sweep::sweep;
use super::users::delete_user_tx;
use super::{db_error, SqliteStore};

const SQLITE_HEADER: &[u8] = b"SQLite format 3\0";

/// Children before parents, so that replacing rows never trips a foreign key.
const CLEAR_ORDER: [AdminTable; 7] = [
    AdminTable::Comments,
    AdminTable::SavedPosts,
    AdminTable::PostImages,
    AdminTable::Images,
    AdminTable::Posts,
    AdminTable::VerificationCodes,
    AdminTable::Users,
];

fn invalid_snapshot() -> DomainError {
    DomainError::validation("Invalid file. Must be a SQLite database.")
}

async fn column_names(
    conn: &mut SqliteConnection,
    schema: &str,
    table: AdminTable,
) -> std::result::Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT name FROM pragma_table_info(?, ?) ORDER BY cid")
        .bind(table.as_str())
        .bind(schema)
        .fetch_all(&mut *conn)
        .await
}

fn quoted(columns: &[String]) -> String {
    columns.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ")
}

async fn all_ids(
    conn: &mut SqliteConnection,
    sql: &str,
) -> std::result::Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar(sql).fetch_all(&mut *conn).await
}

async fn delete_image_tx(
    conn: &mut SqliteConnection,
    id: i64,
) -> std::result::Result<Option<SweepReport>, sqlx::Error> {
    let image: Option<ImageRow> =
        sqlx::query_as(&format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(image) = image else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM images WHERE id = ?").bind(id).execute(&mut *conn).await?;

    let mut report = SweepReport { removed_images: vec![Image::from(image)], ..Default::default() };
    report.merge(sweep(conn).await?);
    Ok(Some(report))
}

async fn restore_from_attached(
    conn: &mut SqliteConnection,
) -> std::result::Result<(), DomainError> {
    let present: Vec<String> =
        sqlx::query_scalar("SELECT name FROM backup.sqlite_master WHERE type = 'table'")
            .fetch_all(&mut *conn)
            .await
            .map_err(|_| invalid_snapshot())?;

    if let Some(missing) = AdminTable::ALL.iter().find(|t| !present.iter().any(|p| p == t.as_str())) {
        return Err(DomainError::validation(format!(
            "The backup has no '{missing}' table."
        )));
    }

    let mut tx = conn.begin().await.map_err(db_error)?;

    for table in CLEAR_ORDER {
        sqlx::query(&format!("DELETE FROM main.\"{table}\""))
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
    }

    for table in CLEAR_ORDER.iter().rev() {
        let columns = quoted(&column_names(&mut tx, "main", *table).await.map_err(db_error)?);
        sqlx::query(&format!(
            "INSERT INTO main.\"{table}\" ({columns}) SELECT {columns} FROM backup.\"{table}\""
        ))
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            tracing::warn!(%table, error = %err, "backup rows do not fit the current schema");
            DomainError::validation(format!("The backup's '{table}' table does not match the current schema."))
        })?;
    }

    tx.commit().await.map_err(db_error)
}

#[async_trait]
impl TableRepository for SqliteStore {
    async fn dump(&self, table: AdminTable) -> Result<TableDump> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        let columns = column_names(&mut conn, "main", table).await.map_err(db_error)?;

        let pairs = columns
            .iter()
            .map(|c| format!("'{c}', \"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");

        let raw: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT json_object({pairs}) FROM \"{table}\" ORDER BY rowid"
        ))
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error)?;

        let rows = raw
            .iter()
            .map(|json| match serde_json::from_str::<Value>(json) {
                Ok(Value::Object(map)) => Ok(map),
                _ => Err(DomainError::internal(format!("malformed row in {table}"))),
            })
            .collect::<Result<Vec<Map<String, Value>>>>()?;

        Ok(TableDump { columns, rows })
    }

    async fn delete_one(&self, table: AdminTable, id: i64) -> Result<Option<SweepReport>> {
        if table.is_association() {
            return Err(DomainError::forbidden("Deletion forbidden for this table."));
        }

        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let report = match table {
            AdminTable::Users => {
                let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error)?;
                match role.as_deref() {
                    None => None,
                    Some("admin") => return Err(DomainError::forbidden("Cannot delete admin user.")),
                    Some(_) => Some(delete_user_tx(&mut tx, id).await.map_err(db_error)?),
                }
            }
            AdminTable::Posts => {
                if post_exists(&mut tx, id).await.map_err(db_error)? {
                    Some(delete_post_tx(&mut tx, id).await.map_err(db_error)?)
                } else {
                    None
                }
            }
            AdminTable::Comments => match fetch_comment(&mut tx, id).await.map_err(db_error)? {
                Some(comment) => Some(delete_comment_tx(&mut tx, &comment).await.map_err(db_error)?),
                None => None,
            },
            AdminTable::VerificationCodes => {
                let removed = sqlx::query("DELETE FROM verification_codes WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error)?
                    .rows_affected();
                (removed > 0).then(SweepReport::default)
            }
            AdminTable::Images => delete_image_tx(&mut tx, id).await.map_err(db_error)?,
            AdminTable::PostImages | AdminTable::SavedPosts => None,
        };

        tx.commit().await.map_err(db_error)?;

        if report.is_some() {
            tracing::info!(%table, id, "admin deleted record");
        }
        Ok(report)
    }

    async fn delete_all(&self, table: AdminTable) -> Result<(u64, SweepReport)> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let mut report = SweepReport::default();

        let count = match table {
            AdminTable::Users => {
                let ids = all_ids(&mut tx, "SELECT id FROM users WHERE role <> 'admin'")
                    .await
                    .map_err(db_error)?;
                for id in &ids {
                    report.merge(delete_user_tx(&mut tx, *id).await.map_err(db_error)?);
                }
                ids.len() as u64
            }
            AdminTable::Posts => {
                let ids = all_ids(&mut tx, "SELECT id FROM posts").await.map_err(db_error)?;
                for id in &ids {
                    report.merge(delete_post_tx(&mut tx, *id).await.map_err(db_error)?);
                }
                ids.len() as u64
            }
            AdminTable::Images => {
                let images: Vec<ImageRow> =
                    sqlx::query_as(&format!("SELECT {IMAGE_COLUMNS} FROM images"))
                        .fetch_all(&mut *tx)
                        .await
                        .map_err(db_error)?;
                sqlx::query("DELETE FROM images").execute(&mut *tx).await.map_err(db_error)?;

                report.removed_images = images.into_iter().map(Image::from).collect();
                report.merge(sweep(&mut tx).await.map_err(db_error)?);
                report.removed_images.len() as u64
            }
            AdminTable::Comments
            | AdminTable::VerificationCodes
            | AdminTable::PostImages
            | AdminTable::SavedPosts => {
                let removed = sqlx::query(&format!("DELETE FROM \"{table}\""))
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error)?
                    .rows_affected();
                report.merge(sweep(&mut tx).await.map_err(db_error)?);
                removed
            }
        };

        tx.commit().await.map_err(db_error)?;

        tracing::info!(%table, count, "admin cleared table");
        Ok((count, report))
    }

    async fn backup(&self) -> Result<Vec<u8>> {
        let dir = tempfile::tempdir()
            .map_err(|e| DomainError::internal(format!("backup workspace: {e}")))?;
        let target = dir.path().join("snapshot.sqlite3");

        // VACUUM INTO refuses to overwrite, so the target must not exist yet.
        sqlx::query("VACUUM INTO ?")
            .bind(target.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        let bytes = tokio::fs::read(&target)
            .await
            .map_err(|e| DomainError::internal(format!("read snapshot: {e}")))?;

        tracing::info!(bytes = bytes.len(), "database snapshot taken");
        Ok(bytes)
    }

    async fn restore(&self, snapshot: Vec<u8>) -> Result<()> {
        if !snapshot.starts_with(SQLITE_HEADER) {
            return Err(invalid_snapshot());
        }

        let dir = tempfile::tempdir()
            .map_err(|e| DomainError::internal(format!("restore workspace: {e}")))?;
        let source = dir.path().join("restore.sqlite3");
        tokio::fs::write(&source, &snapshot)
            .await
            .map_err(|e| DomainError::internal(format!("write snapshot: {e}")))?;

        let mut conn = self.pool.acquire().await.map_err(db_error)?;

        sqlx::query("ATTACH DATABASE ? AS backup")
            .bind(source.to_string_lossy().into_owned())
            .execute(&mut *conn)
            .await
            .map_err(|_| invalid_snapshot())?;

        let outcome = restore_from_attached(&mut conn).await;

        if let Err(err) = sqlx::query("DETACH DATABASE backup").execute(&mut *conn).await {
            tracing::warn!(error = %err, "failed to detach restore source");
        }

        if outcome.is_ok() {
            tracing::info!(bytes = snapshot.len(), "database restored from snapshot");
        }
        outcome
    }
}
