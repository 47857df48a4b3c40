//! Application assembly: database, repositories, tool wrappers, routes.

pub mod routes;
pub mod server;

use crate::state::AppState;
use annotia_core::Config;
use annotia_db::{FileRecordRepository, ProjectRepository};
use annotia_processing::{FfmpegTranscoder, FfprobeProbe};
use annotia_storage::{LocalStoreSettings, SasExpiry};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Wire up the application: connect the database, build the repositories and
/// tool wrappers, and assemble the router.
pub async fn initialize_app(config: Config) -> anyhow::Result<(Arc<AppState>, Router)> {
    let pool = annotia_db::connect(
        config.database_url(),
        config.db_max_connections(),
        config.db_timeout_seconds(),
    )
    .await?;

    let projects = Arc::new(ProjectRepository::new(pool.clone()));
    let file_records = Arc::new(FileRecordRepository::new(pool.clone()));

    let probe = Arc::new(FfprobeProbe::new(config.ffprobe_path().to_string())?);
    let transcoder = Arc::new(FfmpegTranscoder::new(config.ffmpeg_path().to_string())?);

    let local_store = LocalStoreSettings {
        root: PathBuf::from(config.file_store_root()),
        base_url: config.file_store_base_url().to_string(),
    };
    let sas_expiry = SasExpiry {
        publish_days: config.blob_sas_publish_expiry_days(),
        access_days: config.blob_sas_access_expiry_days(),
    };

    let transcode_permits = Arc::new(Semaphore::new(config.max_concurrent_transcodes()));

    let state = Arc::new(AppState {
        config: config.clone(),
        projects,
        file_records,
        probe,
        transcoder,
        local_store,
        sas_expiry,
        transcode_permits,
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
