//! Backend selection
//!
//! A project's storage backend is resolved exactly once, when the ingestion
//! pipeline is assembled for a request. Everything downstream holds the
//! resulting trait object and never re-tests which variant it got.

use crate::azure::AzureBlobStorage;
use crate::local::LocalStorage;
use crate::s3::S3Storage;
use crate::traits::{Storage, StorageError, StorageResult};
use annotia_core::models::ProjectStorageConfig;
use annotia_core::StorageBackend;
use std::path::PathBuf;
use std::sync::Arc;

/// Settings for the local staging root, shared by all projects.
#[derive(Debug, Clone)]
pub struct LocalStoreSettings {
    pub root: PathBuf,
    pub base_url: String,
}

/// SAS token lifetimes for the blob store backend, in days.
#[derive(Debug, Clone, Copy)]
pub struct SasExpiry {
    pub publish_days: u64,
    pub access_days: u64,
}

/// Build the storage backend a project is configured for.
///
/// Selecting the blob store also creates the backing container when it does
/// not exist yet, so first-time projects work without manual provisioning.
pub async fn storage_for_project(
    config: &ProjectStorageConfig,
    local: &LocalStoreSettings,
    sas: SasExpiry,
) -> StorageResult<Arc<dyn Storage>> {
    match config.backend {
        StorageBackend::Local => {
            let storage = LocalStorage::new(local.root.clone(), local.base_url.clone()).await?;
            Ok(Arc::new(storage))
        }
        StorageBackend::ObjectStore => {
            let settings = config.s3.as_ref().ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "Project {} uses the object store backend but has no S3 settings",
                    config.project_id
                ))
            })?;
            Ok(Arc::new(S3Storage::new(settings)?))
        }
        StorageBackend::BlobStore => {
            let settings = config.azure.as_ref().ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "Project {} uses the blob store backend but has no blob settings",
                    config.project_id
                ))
            })?;
            let storage = AzureBlobStorage::new(settings, sas)?;
            storage.ensure_container().await?;
            Ok(Arc::new(storage))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn sas() -> SasExpiry {
        SasExpiry {
            publish_days: 365,
            access_days: 1,
        }
    }

    #[tokio::test]
    async fn local_backend_is_selected_from_project_config() {
        let dir = tempdir().unwrap();
        let config = ProjectStorageConfig::local(Uuid::new_v4(), Uuid::new_v4());
        let local = LocalStoreSettings {
            root: dir.path().to_path_buf(),
            base_url: String::new(),
        };

        let storage = storage_for_project(&config, &local, sas()).await.unwrap();
        assert_eq!(storage.backend(), StorageBackend::Local);
    }

    #[tokio::test]
    async fn cloud_backend_without_settings_is_a_config_error() {
        let dir = tempdir().unwrap();
        let local = LocalStoreSettings {
            root: dir.path().to_path_buf(),
            base_url: String::new(),
        };

        let mut config = ProjectStorageConfig::local(Uuid::new_v4(), Uuid::new_v4());
        config.backend = StorageBackend::ObjectStore;
        let result = storage_for_project(&config, &local, sas()).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));

        config.backend = StorageBackend::BlobStore;
        let result = storage_for_project(&config, &local, sas()).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }
}
