//! # Media storage
//!
//! Implementations of `MediaStorage`. Uploads are sniffed before anything
//! is written so that only recognised image formats are ever stored.

mod local;

pub use local::LocalMediaStorage;

use domains::{DomainError, Upload};
use image::ImageFormat;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

/// Checks size and magic bytes, returning the file extension to store under.
/// The declared content type is not trusted.
pub fn sniff(upload: &Upload) -> Result<&'static str, DomainError> {
    if upload.data.is_empty() {
        return Err(DomainError::validation(format!("'{}' is empty.", upload.file_name)));
    }
    if upload.data.len() > MAX_UPLOAD_BYTES {
        return Err(DomainError::validation(format!(
            "'{}' is larger than 8 MB.",
            upload.file_name
        )));
    }

    match image::guess_format(&upload.data) {
        Ok(ImageFormat::Jpeg) => Ok("jpg"),
        Ok(ImageFormat::Png) => Ok("png"),
        Ok(ImageFormat::Gif) => Ok("gif"),
        Ok(ImageFormat::WebP) => Ok("webp"),
        _ => Err(DomainError::validation(format!(
            "'{}' is not a supported image (JPEG, PNG, GIF or WebP).",
            upload.file_name
        ))),
    }
}
