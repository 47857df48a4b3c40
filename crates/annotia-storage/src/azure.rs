use crate::factory::SasExpiry;
use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult};
use annotia_core::models::{AzureBlobSettings, FileScope};
use annotia_core::StorageBackend;
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use http::Method;
use object_store::azure::{MicrosoftAzure, MicrosoftAzureBuilder};
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use sha2::Sha256;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

const STORAGE_API_VERSION: &str = "2021-08-06";

/// Azure-style blob store implementation
///
/// Write addresses are SAS URLs with a long publish expiry so uploads started
/// near issuance never outlive their token; read addresses use a short access
/// expiry and are re-signed on every retrieval.
pub struct AzureBlobStorage {
    store: MicrosoftAzure,
    account: String,
    access_key: String,
    container: String,
    endpoint: Option<String>,
    expiry: SasExpiry,
    http: reqwest::Client,
}

impl AzureBlobStorage {
    pub fn new(settings: &AzureBlobSettings, expiry: SasExpiry) -> StorageResult<Self> {
        let mut builder = MicrosoftAzureBuilder::new()
            .with_account(settings.account.clone())
            .with_access_key(settings.access_key.clone())
            .with_container_name(settings.container.clone());

        if let Some(ref endpoint) = settings.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(AzureBlobStorage {
            store,
            account: settings.account.clone(),
            access_key: settings.access_key.clone(),
            container: settings.container.clone(),
            endpoint: settings.endpoint.clone(),
            expiry,
            http: reqwest::Client::new(),
        })
    }

    fn publish_expiry(&self) -> Duration {
        Duration::from_secs(self.expiry.publish_days * 24 * 60 * 60)
    }

    fn access_expiry(&self) -> Duration {
        Duration::from_secs(self.expiry.access_days * 24 * 60 * 60)
    }

    fn container_url(&self) -> String {
        let base = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.blob.core.windows.net", self.account),
        };
        format!("{}/{}?restype=container", base, self.container)
    }

    /// Create the backing container if it does not exist yet.
    ///
    /// Issues a SharedKey-signed Create Container request directly against the
    /// blob REST endpoint. An AlreadyExists conflict is success.
    pub async fn ensure_container(&self) -> StorageResult<()> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let string_to_sign = create_container_string_to_sign(
            &self.account,
            &self.container,
            &date,
            STORAGE_API_VERSION,
        );
        let signature = shared_key_signature(&self.access_key, &string_to_sign)?;

        let url = self.container_url();
        let response = self
            .http
            .put(&url)
            .header("x-ms-date", &date)
            .header("x-ms-version", STORAGE_API_VERSION)
            .header(
                "Authorization",
                format!("SharedKey {}:{}", self.account, signature),
            )
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(|e| StorageError::BackendError(format!("Create container failed: {}", e)))?;

        match response.status().as_u16() {
            201 => {
                tracing::info!(
                    account = %self.account,
                    container = %self.container,
                    "Blob container created"
                );
                Ok(())
            }
            409 => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StorageError::BackendError(format!(
                    "Create container returned status {}: {}",
                    status, body
                )))
            }
        }
    }
}

/// String-to-sign for a SharedKey Create Container request.
///
/// Layout per the Blob service 2015-02-21+ rules: empty Content-Length for a
/// zero-length body, canonicalized x-ms headers, then the canonicalized
/// resource with the restype query parameter.
fn create_container_string_to_sign(
    account: &str,
    container: &str,
    date: &str,
    version: &str,
) -> String {
    format!(
        "PUT\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:{date}\nx-ms-version:{version}\n/{account}/{container}\nrestype:container"
    )
}

fn shared_key_signature(access_key: &str, string_to_sign: &str) -> StorageResult<String> {
    let key = base64::engine::general_purpose::STANDARD
        .decode(access_key)
        .map_err(|e| StorageError::ConfigError(format!("Invalid account key: {}", e)))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|e| StorageError::SigningFailed(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());

    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl Storage for AzureBlobStorage {
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
            .signed_url(Method::PUT, &location, self.publish_expiry())
            .await;

        let url = url_result
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    container = %self.container,
                    key = %key,
                    "Blob SAS write signing failed"
                );
                StorageError::SigningFailed(e.to_string())
            })?
            .to_string();

        Ok(url)
    }

    async fn finalize_retrieval_url(&self, storage_key: &str) -> StorageResult<String> {
        let location = ObjectPath::from(storage_key.to_string());

        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, self.access_expiry())
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
                container = %self.container,
                key = %storage_key,
                "Blob publish failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            container = %self.container,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob publish successful"
        );

        Ok(())
    }

    async fn delete_artifact(&self, storage_key: &str) -> StorageResult<()> {
        let location = ObjectPath::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(_) => {
                tracing::info!(container = %self.container, key = %storage_key, "Blob delete successful");
                Ok(())
            }
            Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, container = %self.container, key = %storage_key, "Blob delete failed");
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::BlobStore
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_to_sign_matches_shared_key_layout() {
        let s = create_container_string_to_sign(
            "devaccount",
            "annotia",
            "Wed, 01 Jan 2025 00:00:00 GMT",
            STORAGE_API_VERSION,
        );

        assert!(s.starts_with("PUT\n"));
        assert!(s.contains("x-ms-date:Wed, 01 Jan 2025 00:00:00 GMT\n"));
        assert!(s.contains(&format!("x-ms-version:{}\n", STORAGE_API_VERSION)));
        assert!(s.ends_with("/devaccount/annotia\nrestype:container"));
        // Eleven empty standard headers between the verb and x-ms-date.
        assert_eq!(s.matches('\n').count(), 15);
    }

    #[test]
    fn signature_requires_base64_account_key() {
        let err = shared_key_signature("not base64!!!", "PUT\n").unwrap_err();
        assert!(matches!(err, StorageError::ConfigError(_)));

        let key = base64::engine::general_purpose::STANDARD.encode(b"secret");
        assert!(shared_key_signature(&key, "PUT\n").is_ok());
    }

    #[test]
    fn container_url_honours_custom_endpoint() {
        let settings = AzureBlobSettings {
            account: "devaccount".to_string(),
            access_key: base64::engine::general_purpose::STANDARD.encode(b"secret"),
            container: "annotia".to_string(),
            endpoint: Some("http://127.0.0.1:10000/devaccount".to_string()),
        };
        let storage = AzureBlobStorage::new(
            &settings,
            SasExpiry {
                publish_days: 365,
                access_days: 1,
            },
        )
        .unwrap();

        assert_eq!(
            storage.container_url(),
            "http://127.0.0.1:10000/devaccount/annotia?restype=container"
        );
    }
}
