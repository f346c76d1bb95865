use domains::{MediaStorage, StoredMedia};

/// Destroys hosted media without letting a failure reach the caller.
/// The database change that orphaned the media has already committed.
pub(crate) async fn release<'a, I>(media: &dyn MediaStorage, public_ids: I)
where
    I: IntoIterator<Item = &'a str>,
{
    for public_id in public_ids {
        if let Err(err) = media.destroy(public_id).await {
            tracing::warn!(%public_id, error = %err, "failed to destroy media");
        }
    }
}

/// Stores every upload, or none of them: on the first failure the ones
/// already stored are released.
pub(crate) async fn store_all(
    media: &dyn MediaStorage,
    uploads: Vec<domains::Upload>,
) -> domains::Result<Vec<StoredMedia>> {
    let mut stored = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match media.upload(upload).await {
            Ok(item) => stored.push(item),
            Err(err) => {
                release(media, stored.iter().map(|s| s.public_id.as_str()).collect::<Vec<_>>()).await;
                return Err(err);
            }
        }
    }
    Ok(stored)
}
