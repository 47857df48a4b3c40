use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage_types::StorageBackend;

/// S3-compatible object store settings for one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, Spaces, ...).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

/// Azure-like blob store settings for one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureBlobSettings {
    pub account: String,
    pub access_key: String,
    pub container: String,
    /// Custom endpoint for Azurite or sovereign clouds.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Storage configuration for one project. Owned by project administration;
/// read-only to the ingestion subsystem.
#[derive(Debug, Clone)]
pub struct ProjectStorageConfig {
    pub org_id: Uuid,
    pub project_id: Uuid,
    pub backend: StorageBackend,
    pub s3: Option<S3Settings>,
    pub azure: Option<AzureBlobSettings>,
}

impl ProjectStorageConfig {
    /// A project backed by the local filesystem (the default).
    pub fn local(org_id: Uuid, project_id: Uuid) -> Self {
        Self {
            org_id,
            project_id,
            backend: StorageBackend::Local,
            s3: None,
            azure: None,
        }
    }
}
