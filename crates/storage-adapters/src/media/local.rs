//! Local filesystem implementation of `MediaStorage`.
//! Files are sharded two levels deep by the first characters of their
//! public id and served back under a URL prefix.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use domains::{DomainError, MediaStorage, Result, StoredMedia, Upload};
use tokio::fs;
use uuid::Uuid;

use super::sniff;

pub struct LocalMediaStorage {
    /// Root directory for all uploads (e.g., "./data/media")
    root: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self { root: root.into(), url_prefix: url_prefix.into().trim_end_matches('/').to_string() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// "ab/cd/abcd…": `None` for ids this store could not have issued.
    fn relative_path(public_id: &str) -> Option<String> {
        let valid = public_id.len() > 4
            && public_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
            && !public_id.contains("..");
        valid.then(|| format!("{}/{}/{}", &public_id[0..2], &public_id[2..4], public_id))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn upload(&self, upload: Upload) -> Result<StoredMedia> {
        let extension = sniff(&upload)?;
        let public_id = format!("{}.{extension}", Uuid::new_v4().simple());
        let relative = Self::relative_path(&public_id)
            .ok_or_else(|| DomainError::internal("generated media id is not storable"))?;

        let target = self.root.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::upstream(format!("Media storage failed: {e}")))?;
        }
        fs::write(&target, &upload.data)
            .await
            .map_err(|e| DomainError::upstream(format!("Media storage failed: {e}")))?;

        tracing::debug!(%public_id, bytes = upload.data.len(), "media stored");
        Ok(StoredMedia { url: format!("{}/{relative}", self.url_prefix), public_id })
    }

    async fn destroy(&self, public_id: &str) -> Result<()> {
        let relative = Self::relative_path(public_id)
            .ok_or_else(|| DomainError::validation(format!("Unknown media id '{public_id}'.")))?;

        match fs::remove_file(self.root.join(relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::upstream(format!("Media removal failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";

    fn gif() -> Upload {
        Upload { file_name: "dot.gif".into(), content_type: mime::IMAGE_GIF, data: Bytes::from_static(GIF) }
    }

    #[tokio::test]
    async fn upload_then_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path(), "/media/");

        let stored = storage.upload(gif()).await.unwrap();
        assert!(stored.public_id.ends_with(".gif"));
        assert!(stored.url.starts_with("/media/"));
        assert!(stored.url.ends_with(&stored.public_id));

        let on_disk = dir.path().join(LocalMediaStorage::relative_path(&stored.public_id).unwrap());
        assert_eq!(std::fs::read(&on_disk).unwrap(), GIF);

        storage.destroy(&stored.public_id).await.unwrap();
        assert!(!on_disk.exists());
        // A second destroy is a no-op.
        storage.destroy(&stored.public_id).await.unwrap();
    }

    #[tokio::test]
    async fn destroy_refuses_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path(), "/media");
        assert!(storage.destroy("../../etc/passwd").await.is_err());
    }
}
