use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult};
use annotia_core::models::FileScope;
use annotia_core::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Local filesystem storage implementation
///
/// The base path doubles as the staging root: what the upload receiver writes
/// there is already in its final resting place for this backend.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/annotia/files")
    /// * `base_url` - Base URL for serving files; empty means server-relative paths
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys that could escape the base storage directory.
    pub fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        if let Ok(base_canonical) = self.base_path.canonicalize() {
            if let Ok(canonical) = path.canonicalize() {
                if canonical.strip_prefix(&base_canonical).is_err() {
                    return Err(StorageError::InvalidKey(
                        "Storage key resolves outside storage directory".to_string(),
                    ));
                }
            }
        }

        Ok(path)
    }

    /// Generate retrieval URL for a key. With an empty base URL this is the
    /// server-relative path `/{key}`, which is stable across calls.
    fn generate_url(&self, key: &str) -> String {
        if self.base_url.is_empty() {
            format!("/{}", key)
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), key)
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn reserve_upload_target(
        &self,
        scope: &FileScope,
        file_id: Uuid,
        stored_name: &str,
        _content_type: &str,
    ) -> StorageResult<String> {
        // Make sure the project's file directory exists so the receiver can
        // stream straight into it.
        let key = keys::file_key(scope, stored_name);
        let path = self.key_to_path(&key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        Ok(keys::upload_endpoint(scope, file_id))
    }

    async fn finalize_retrieval_url(&self, storage_key: &str) -> StorageResult<String> {
        self.key_to_path(storage_key)?;
        Ok(self.generate_url(storage_key))
    }

    async fn publish_local_artifact(
        &self,
        local_path: &Path,
        storage_key: &str,
        _content_type: &str,
    ) -> StorageResult<()> {
        // The artifact already lives under the staging root for this backend;
        // just verify it is where the key says it is.
        let expected = self.key_to_path(storage_key)?;

        if !fs::try_exists(&expected).await.unwrap_or(false) {
            return Err(StorageError::NotFound(format!(
                "Local artifact missing at {}",
                expected.display()
            )));
        }

        tracing::debug!(
            local_path = %local_path.display(),
            key = %storage_key,
            "Local publish is a no-op; artifact already in place"
        );

        Ok(())
    }

    async fn delete_artifact(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), key = %storage_key, "Local artifact deleted");

        Ok(())
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scope() -> FileScope {
        FileScope::new(Uuid::new_v4(), Uuid::new_v4())
    }

    #[tokio::test]
    async fn reserve_returns_upload_endpoint_and_creates_dir() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), String::new()).await.unwrap();

        let scope = scope();
        let file_id = Uuid::new_v4();
        let address = storage
            .reserve_upload_target(&scope, file_id, &format!("{}.png", file_id), "image/png")
            .await
            .unwrap();

        assert_eq!(address, keys::upload_endpoint(&scope, file_id));
        let files_dir = dir
            .path()
            .join(format!("orgs/{}/projects/{}/files", scope.org_id, scope.project_id));
        assert!(files_dir.is_dir());
    }

    #[tokio::test]
    async fn retrieval_url_is_stable_across_calls() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), String::new()).await.unwrap();

        let key = keys::file_key(&scope(), "a.png");
        let first = storage.finalize_retrieval_url(&key).await.unwrap();
        let second = storage.finalize_retrieval_url(&key).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, format!("/{}", key));
    }

    #[tokio::test]
    async fn path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), String::new()).await.unwrap();

        let result = storage.finalize_retrieval_url("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete_artifact("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn delete_missing_artifact_is_ok() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), String::new()).await.unwrap();

        let key = keys::file_key(&scope(), "nonexistent.png");
        assert!(storage.delete_artifact(&key).await.is_ok());
        // Twice: cleanup must be idempotent.
        assert!(storage.delete_artifact(&key).await.is_ok());
    }

    #[tokio::test]
    async fn publish_verifies_artifact_presence() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), String::new()).await.unwrap();

        let scope = scope();
        let key = keys::file_key(&scope, "present.png");
        let path = dir.path().join(&key);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"bytes").await.unwrap();

        assert!(storage
            .publish_local_artifact(&path, &key, "image/png")
            .await
            .is_ok());

        let missing = keys::file_key(&scope, "missing.png");
        let result = storage
            .publish_local_artifact(&path, &missing, "image/png")
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
