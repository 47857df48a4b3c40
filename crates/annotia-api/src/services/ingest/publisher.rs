//! Backend publishing.
//!
//! Moves a finalized local artifact into the project's backend and resolves
//! its retrieval URL. For the local backend the artifact already sits in its
//! final resting place; for cloud backends it is mirrored outward and the
//! local copy dropped.

use annotia_core::{AppError, StorageBackend};
use annotia_storage::Storage;
use std::path::Path;

use crate::error::storage_error_to_app;

/// Publish a local artifact under `storage_key` and return its retrieval URL.
///
/// On publish failure the local artifact is left in place so a retry or
/// manual recovery can reuse it.
pub async fn publish(
    storage: &dyn Storage,
    local_path: &Path,
    storage_key: &str,
    content_type: &str,
) -> Result<String, AppError> {
    storage
        .publish_local_artifact(local_path, storage_key, content_type)
        .await
        .map_err(storage_error_to_app)?;

    if storage.backend() != StorageBackend::Local {
        // Mirrored to the backend; the staged copy is no longer needed.
        if let Err(e) = tokio::fs::remove_file(local_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %local_path.display(),
                    error = %e,
                    "Failed to remove staged artifact after publish"
                );
            }
        }
    }

    let url = storage
        .finalize_retrieval_url(storage_key)
        .await
        .map_err(storage_error_to_app)?;

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotia_core::models::FileScope;
    use annotia_storage::{keys, LocalStorage};
    use tempfile::tempdir;
    use uuid::Uuid;

    #[tokio::test]
    async fn local_publish_keeps_artifact_and_returns_stable_url() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), String::new()).await.unwrap();

        let scope = FileScope::new(Uuid::new_v4(), Uuid::new_v4());
        let key = keys::file_key(&scope, "a.png");
        let path = dir.path().join(&key);
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&path, b"png bytes").await.unwrap();

        let url = publish(&storage, &path, &key, "image/png").await.unwrap();

        assert_eq!(url, format!("/{}", key));
        // Local backend: the staged file IS the published file.
        assert!(path.exists());
    }

    #[tokio::test]
    async fn missing_artifact_fails_and_is_not_persisted() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), String::new()).await.unwrap();

        let scope = FileScope::new(Uuid::new_v4(), Uuid::new_v4());
        let key = keys::file_key(&scope, "missing.png");
        let path = dir.path().join(&key);

        let result = publish(&storage, &path, &key, "image/png").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
