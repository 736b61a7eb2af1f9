//! Image upload — POST /upload-image (multipart field `image`).
//!
//! Stored files are served back from `/uploads/<name>`.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use hearth_core::error::{HearthError, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::ApiError;
use crate::app::AppState;

pub const UPLOADS_ROUTE: &str = "/uploads";
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Multipart field carrying the file.
const FIELD_NAME: &str = "image";
/// Stem used when sanitizing leaves nothing.
const FALLBACK_STEM: &str = "image";

#[derive(Serialize)]
pub struct UploadReply {
    pub url: String,
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

/// POST /upload-image
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> std::result::Result<Json<UploadReply>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FIELD_NAME) {
            continue;
        }
        // a part without a filename is a plain form value, not a file
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let ext = validate(&file_name)?;
        let data = field.bytes().await?;

        let name = stored_name(&file_name, &ext, Utc::now());
        let dir = Path::new(&state.config.web.uploads_dir);
        tokio::fs::write(dir.join(&name), &data)
            .await
            .map_err(HearthError::from)?;

        info!(file = %name, bytes = data.len(), "stored upload");
        return Ok(Json(UploadReply {
            url: format!("{UPLOADS_ROUTE}/{name}"),
        }));
    }

    Err(ApiError::bad_request("No image uploaded"))
}

/// Check the client filename and return its lower-cased extension.
fn validate(file_name: &str) -> Result<String> {
    if file_name.is_empty() {
        return Err(HearthError::InvalidUpload("Empty filename".to_string()));
    }
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| HearthError::InvalidUpload("File type not allowed".to_string()))
}

/// `{sanitized stem}_{UTC timestamp with microseconds}.{ext}`
fn stored_name(file_name: &str, ext: &str, now: DateTime<Utc>) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    let mut stem = sanitize(stem);
    if stem.is_empty() {
        stem = FALLBACK_STEM.to_string();
    }
    format!("{stem}_{}.{ext}", now.format("%Y%m%d%H%M%S%6f"))
}

/// Reduce a client-supplied name to a safe ASCII file stem.
///
/// Path separators become spaces, whitespace runs become `_`, anything other
/// than ASCII alphanumerics, `.`, `_` and `-` is dropped, and leading or
/// trailing `.`/`_` are stripped so the result can never walk directories.
fn sanitize(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}
