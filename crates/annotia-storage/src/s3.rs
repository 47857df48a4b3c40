use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult};
use annotia_core::config::OBJECT_STORE_PRESIGN_EXPIRY_SECS;
use annotia_core::models::{FileScope, S3Settings};
use annotia_core::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// S3-compatible object store implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage instance from one project's settings.
    ///
    /// Credentials may come from the project settings or, when absent there,
    /// from the environment. A custom endpoint enables S3-compatible
    /// providers (e.g., "http://localhost:9000" for MinIO).
    pub fn new(settings: &S3Settings) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(settings.region.clone())
            .with_bucket_name(settings.bucket.clone());

        if let Some(ref access_key_id) = settings.access_key_id {
            builder = builder.with_access_key_id(access_key_id.clone());
        }
        if let Some(ref secret) = settings.secret_access_key {
            builder = builder.with_secret_access_key(secret.clone());
        }
        if let Some(ref endpoint) = settings.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket: settings.bucket.clone(),
        })
    }

    fn presign_expiry() -> Duration {
        Duration::from_secs(OBJECT_STORE_PRESIGN_EXPIRY_SECS)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn reserve_upload_target(
        &self,
        scope: &FileScope,
        _file_id: Uuid,
        stored_name: &str,
        _content_type: &str,
    ) -> StorageResult<String> {
        let key = keys::file_key(scope, stored_name);
        let location = ObjectPath::from(key.clone());

        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::PUT, &location, Self::presign_expiry())
            .await;

        let url = url_result
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.bucket, key = %key, "S3 presign PUT failed");
                StorageError::SigningFailed(e.to_string())
            })?
            .to_string();

        Ok(url)
    }

    async fn finalize_retrieval_url(&self, storage_key: &str) -> StorageResult<String> {
        let location = ObjectPath::from(storage_key.to_string());

        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, Self::presign_expiry())
            .await;

        let url = url_result
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?
            .to_string();

        Ok(url)
    }

    async fn publish_local_artifact(
        &self,
        local_path: &Path,
        storage_key: &str,
        _content_type: &str,
    ) -> StorageResult<()> {
        let start = std::time::Instant::now();

        let data = tokio::fs::read(local_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to read local artifact {}: {}",
                local_path.display(),
                e
            ))
        })?;
        let size = data.len() as u64;
        let bytes = Bytes::from(data);
        let location = ObjectPath::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(bytes)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 publish failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 publish successful"
        );

        Ok(())
    }

    async fn delete_artifact(&self, storage_key: &str) -> StorageResult<()> {
        let location = ObjectPath::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket, key = %storage_key, "S3 delete successful");
                Ok(())
            }
            Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, bucket = %self.bucket, key = %storage_key, "S3 delete failed");
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::ObjectStore
    }
}
