use annotia_core::{AppError, Config};
use annotia_db::{FileRecordStore, ProjectDirectory};
use annotia_processing::{Probe, Transcode};
use annotia_storage::{storage_for_project, LocalStoreSettings, SasExpiry, Storage};
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::storage_error_to_app;

/// Shared application state injected into every handler.
///
/// Repositories and tool wrappers are held as trait objects so tests can
/// substitute in-memory fakes.
pub struct AppState {
    pub config: Config,
    pub projects: Arc<dyn ProjectDirectory>,
    pub file_records: Arc<dyn FileRecordStore>,
    pub probe: Arc<dyn Probe>,
    pub transcoder: Arc<dyn Transcode>,
    pub local_store: LocalStoreSettings,
    pub sas_expiry: SasExpiry,
    /// Bounds concurrent ffmpeg invocations across all requests.
    pub transcode_permits: Arc<Semaphore>,
}

impl AppState {
    /// Resolve the storage backend a project is configured for.
    ///
    /// This is the single place the backend variant is selected; everything
    /// downstream works against the `Storage` trait object.
    pub async fn storage_for(
        &self,
        org_id: Uuid,
        project_id: Uuid,
    ) -> Result<Arc<dyn Storage>, AppError> {
        let project_config = self.projects.storage_config(org_id, project_id).await?;

        storage_for_project(&project_config, &self.local_store, self.sas_expiry)
            .await
            .map_err(storage_error_to_app)
    }
}
