//! Naming rules shared across the ingestion pipeline.
//!
//! Staged artifacts live under the project's files directory as
//! `{fileId}{ext}`, with video raw uploads at `{fileId}_tmp{ext}` and encoder
//! progress at `{fileId}_progress.json`.

use annotia_core::AppError;
use chrono::Utc;
use uuid::Uuid;

/// What the issuer hands back to a client that wants to upload.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub file_id: Uuid,
    pub upload_url: String,
    pub relative_path: String,
    pub stored_name: String,
    pub updated_original_name: String,
}

/// Split a filename into stem and extension (extension keeps its dot,
/// lowercased). Errors when there is no extension to derive a type from.
pub fn split_name(filename: &str) -> Result<(String, String), AppError> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Filename is empty".to_string()));
    }

    match trimmed.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            Ok((stem.to_string(), format!(".{}", ext.to_lowercase())))
        }
        _ => Err(AppError::Validation(format!(
            "Filename has no extension: {}",
            trimmed
        ))),
    }
}

/// Disambiguate a duplicate original name by appending the current epoch
/// milliseconds to the stem. Best-effort: two requests in the same
/// millisecond can still collide, which renames a file but corrupts nothing.
pub fn disambiguate(stem: &str, ext: &str) -> String {
    format!("{}-{}{}", stem, Utc::now().timestamp_millis(), ext)
}

pub fn stored_file_name(file_id: Uuid, ext: &str) -> String {
    format!("{}{}", file_id, ext)
}

pub fn tmp_file_name(file_id: Uuid, ext: &str) -> String {
    format!("{}_tmp{}", file_id, ext)
}

pub fn progress_file_name(file_id: Uuid) -> String {
    format!("{}_progress.json", file_id)
}

pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.trim_start_matches('.') {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}
