//! Buffers a `multipart/form-data` body into text fields and file uploads.

use std::collections::HashMap;

use axum::extract::Multipart;
use domains::Upload;

use super::error::ApiError;

#[derive(Debug, Default)]
pub struct FormParts {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<Upload>>,
}

impl FormParts {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut parts = FormParts::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::BadRequest(e.body_text()))? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .and_then(|ct| ct.parse::<mime::Mime>().ok())
                        .unwrap_or(mime::APPLICATION_OCTET_STREAM);
                    let data = field.bytes().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    // An untouched file input still submits an empty part.
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }
                    parts.files.entry(name).or_default().push(Upload { file_name, content_type, data });
                }
                None => {
                    let text = field.text().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    parts.fields.entry(name).or_default().push(text);
                }
            }
        }

        Ok(parts)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(|values| values.first()).cloned()
    }

    /// Integer ids sent either as repeated fields or as one comma-separated value.
    pub fn ids(&self, name: &str) -> Result<Vec<i64>, ApiError> {
        self.fields
            .get(name)
            .into_iter()
            .flatten()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| v.parse::<i64>().map_err(|_| ApiError::BadRequest(format!("Invalid id '{v}' in {name}."))))
            .collect()
    }

    pub fn take_files(&mut self, name: &str) -> Vec<Upload> {
        self.files.remove(name).unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.take_files(name).into_iter().next()
    }
}
