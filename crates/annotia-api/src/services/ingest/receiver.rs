//! Raw upload receiving.
//!
//! Streams multipart bytes straight to the staging disk. The stored filename
//! is derived from the extension of the filename that actually arrives, not
//! the one declared at reservation time. On any stream or disk error the
//! partial file is removed before the error is surfaced.

use annotia_core::models::{FileScope, MediaType};
use annotia_core::{AppError, Config};
use annotia_storage::keys;
use axum::extract::Multipart;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::services::ingest::types::{split_name, stored_file_name, tmp_file_name};

/// A successfully staged upload.
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub staged_path: PathBuf,
    pub relative_path: String,
    pub stored_name: String,
    pub original_filename: String,
    pub extension: String,
    pub media_type: MediaType,
    pub size_bytes: u64,
}

/// Classify an upload by the extension of the filename that actually arrived.
pub fn classify_extension(config: &Config, ext: &str) -> Result<MediaType, AppError> {
    let bare = ext.trim_start_matches('.');
    if config.video_allowed_extensions().iter().any(|a| a == bare) {
        Ok(MediaType::Video)
    } else if config.image_allowed_extensions().iter().any(|a| a == bare) {
        Ok(MediaType::Image)
    } else {
        Err(AppError::Validation(format!(
            "Unsupported file extension '{}'",
            bare
        )))
    }
}

/// Stream one multipart upload to the staging directory.
///
/// Video uploads land under a `_tmp` stem since the final artifact comes out
/// of the transcoder, not the raw upload.
pub async fn receive(
    root: &Path,
    scope: &FileScope,
    file_id: Uuid,
    config: &Config,
    mut multipart: Multipart,
) -> Result<ReceivedUpload, AppError> {
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => break field,
            Ok(Some(_)) => continue,
            Ok(None) => {
                return Err(AppError::Validation(
                    "No field named 'file' in upload".to_string(),
                ))
            }
            Err(e) => {
                return Err(AppError::UploadIo(format!(
                    "Failed to read multipart body: {}",
                    e
                )))
            }
        }
    };

    let original_filename = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("Upload field has no filename".to_string()))?;
    let (_, extension) = split_name(&original_filename)?;
    let media_type = classify_extension(config, &extension)?;

    let (disk_name, max_bytes) = match media_type {
        MediaType::Video => (
            tmp_file_name(file_id, &extension),
            config.max_video_size_bytes(),
        ),
        MediaType::Image => (
            stored_file_name(file_id, &extension),
            config.max_image_size_bytes(),
        ),
    };
    // The record's relative path always names the final artifact, tmp or not.
    let stored_name = stored_file_name(file_id, &extension);
    let relative_path = format!("/{}", keys::file_key(scope, &stored_name));

    let files_dir = root.join(format!(
        "orgs/{}/projects/{}/files",
        scope.org_id, scope.project_id
    ));
    fs::create_dir_all(&files_dir)
        .await
        .map_err(|e| AppError::UploadIo(format!("Failed to create staging directory: {}", e)))?;

    let staged_path = files_dir.join(&disk_name);
    let size_bytes = stage_stream(&staged_path, field, max_bytes as u64).await?;

    tracing::info!(
        file_id = %file_id,
        staged_path = %staged_path.display(),
        size_bytes,
        "Upload staged"
    );

    Ok(ReceivedUpload {
        staged_path,
        relative_path,
        stored_name,
        original_filename,
        extension,
        media_type,
        size_bytes,
    })
}

/// Write a byte stream to `dest`, removing the partial file on any failure so
/// no torso is left on disk.
pub async fn stage_stream<S, E>(dest: &Path, mut stream: S, max_bytes: u64) -> Result<u64, AppError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut file = fs::File::create(dest)
        .await
        .map_err(|e| AppError::UploadIo(format!("Failed to create staged file: {}", e)))?;

    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                remove_partial(dest).await;
                return Err(AppError::UploadIo(format!("Upload stream failed: {}", e)));
            }
        };

        written += chunk.len() as u64;
        if written > max_bytes {
            remove_partial(dest).await;
            return Err(AppError::PayloadTooLarge(format!(
                "Upload exceeds maximum size of {} bytes",
                max_bytes
            )));
        }

        if let Err(e) = file.write_all(&chunk).await {
            remove_partial(dest).await;
            return Err(AppError::UploadIo(format!("Failed to write upload: {}", e)));
        }
    }

    if let Err(e) = file.flush().await {
        remove_partial(dest).await;
        return Err(AppError::UploadIo(format!("Failed to flush upload: {}", e)));
    }

    Ok(written)
}

async fn remove_partial(dest: &Path) {
    if let Err(e) = fs::remove_file(dest).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %dest.display(), error = %e, "Failed to remove partial upload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::tempdir;

    fn chunks(parts: Vec<&'static [u8]>) -> impl Stream<Item = Result<Bytes, String>> + Unpin {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p))))
    }

    #[tokio::test]
    async fn staged_bytes_arrive_intact() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("upload.png");

        let written = stage_stream(&dest, chunks(vec![b"hello ", b"world"]), 1024)
            .await
            .unwrap();

        assert_eq!(written, 11);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn stream_error_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("upload.png");

        let broken = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err("client disconnected".to_string()),
        ]);

        let result = stage_stream(&dest, broken, 1024).await;
        assert!(matches!(result, Err(AppError::UploadIo(_))));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn oversize_upload_is_rejected_and_removed() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("upload.mp4");

        let result = stage_stream(&dest, chunks(vec![b"0123456789"]), 5).await;
        assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));
        assert!(!dest.exists());
    }
}
