use annotia_core::models::{AzureBlobSettings, ProjectStorageConfig, S3Settings};
use annotia_core::{AppError, StorageBackend};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Read-only lookup of a project's storage configuration.
///
/// Project administration owns the table; ingestion only resolves it.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Resolve the storage configuration for a project, or `ProjectNotFound`.
    async fn storage_config(
        &self,
        org_id: Uuid,
        project_id: Uuid,
    ) -> Result<ProjectStorageConfig, AppError>;
}

#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectDirectory for ProjectRepository {
    async fn storage_config(
        &self,
        org_id: Uuid,
        project_id: Uuid,
    ) -> Result<ProjectStorageConfig, AppError> {
        let row = sqlx::query(
            "SELECT storage_backend, storage_settings FROM projects WHERE id = $1 AND org_id = $2",
        )
        .bind(project_id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::ProjectNotFound(project_id.to_string()))?;

        let backend: String = row.get("storage_backend");
        let backend: StorageBackend = backend
            .parse()
            .map_err(|e: anyhow::Error| AppError::Database(e.to_string()))?;

        let settings: Option<serde_json::Value> = row.get("storage_settings");

        let mut config = ProjectStorageConfig {
            org_id,
            project_id,
            backend,
            s3: None,
            azure: None,
        };

        match backend {
            StorageBackend::Local => {}
            StorageBackend::ObjectStore => {
                let settings = settings.ok_or_else(|| {
                    AppError::Database(format!(
                        "Project {} has no storage settings for its object store backend",
                        project_id
                    ))
                })?;
                let s3: S3Settings = serde_json::from_value(settings)
                    .map_err(|e| AppError::Database(e.to_string()))?;
                config.s3 = Some(s3);
            }
            StorageBackend::BlobStore => {
                let settings = settings.ok_or_else(|| {
                    AppError::Database(format!(
                        "Project {} has no storage settings for its blob store backend",
                        project_id
                    ))
                })?;
                let azure: AzureBlobSettings = serde_json::from_value(settings)
                    .map_err(|e| AppError::Database(e.to_string()))?;
                config.azure = Some(azure);
            }
        }

        Ok(config)
    }
}
