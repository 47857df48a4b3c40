//! Full video ingestion endpoint: stage, probe, transcode, publish, persist
//! in one request.

use crate::error::{ErrorResponse, HttpAppError};
use crate::services::ingest::{receiver, IngestionOrchestrator};
use crate::state::AppState;
use annotia_core::models::{FileRecord, FileScope, MediaType};
use annotia_core::AppError;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/orgs/{org_id}/projects/{project_id}/files/{file_id}/videos",
    tag = "videos",
    params(
        ("org_id" = Uuid, Path, description = "Organization id"),
        ("project_id" = Uuid, Path, description = "Project id"),
        ("file_id" = Uuid, Path, description = "Reserved file id")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Video ingested and record persisted", body = FileRecord),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Pipeline failed, nothing persisted", body = ErrorResponse)
    )
)]
pub async fn ingest_video(
    State(state): State<Arc<AppState>>,
    Path((org_id, project_id, file_id)): Path<(Uuid, Uuid, Uuid)>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FileRecord>), HttpAppError> {
    let scope = FileScope::new(org_id, project_id);
    let storage = state.storage_for(org_id, project_id).await?;

    let received = receiver::receive(
        &state.local_store.root,
        &scope,
        file_id,
        &state.config,
        multipart,
    )
    .await?;

    if received.media_type != MediaType::Video {
        // The raw upload was staged under its final stem; remove it.
        if let Err(e) = tokio::fs::remove_file(&received.staged_path).await {
            tracing::warn!(path = %received.staged_path.display(), error = %e, "Failed to remove staged non-video upload");
        }
        return Err(AppError::Validation(format!(
            "Expected a video upload, got '{}'",
            received.original_filename
        ))
        .into());
    }

    let orchestrator = IngestionOrchestrator::new(
        state.file_records.clone(),
        state.probe.clone(),
        state.transcoder.clone(),
        state.transcode_permits.clone(),
    );

    let record = orchestrator
        .ingest_video(&scope, file_id, storage, received)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}
