//! File ingestion endpoints: upload target issuance, raw upload receiving,
//! and completion.

use crate::error::{storage_error_to_app, ErrorResponse, HttpAppError};
use crate::services::ingest::receiver;
use crate::services::ingest::types::{content_type_for_extension, split_name};
use crate::services::ingest::UploadTargetIssuer;
use crate::state::AppState;
use annotia_core::models::{FileRecord, FileScope, MediaType};
use annotia_core::{AppError, StorageBackend};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub original_name: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub relative_path: String,
    pub name: String,
    pub file_id: Uuid,
    pub updated_original_name: String,
}

#[utoipa::path(
    post,
    path = "/orgs/{org_id}/projects/{project_id}/files/upload-url",
    tag = "files",
    params(
        ("org_id" = Uuid, Path, description = "Organization id"),
        ("project_id" = Uuid, Path, description = "Project id")
    ),
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Upload target issued", body = UploadUrlResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
pub async fn upload_url(
    State(state): State<Arc<AppState>>,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, HttpAppError> {
    let scope = FileScope::new(org_id, project_id);
    let storage = state.storage_for(org_id, project_id).await?;

    let issuer = UploadTargetIssuer::new(
        state.file_records.as_ref(),
        storage.as_ref(),
        &state.config,
    );
    let target = issuer
        .issue(&scope, &request.original_name, request.media_type)
        .await?;

    Ok(Json(UploadUrlResponse {
        upload_url: target.upload_url,
        relative_path: target.relative_path,
        name: target.stored_name,
        file_id: target.file_id,
        updated_original_name: target.updated_original_name,
    }))
}

#[utoipa::path(
    put,
    path = "/orgs/{org_id}/projects/{project_id}/files/{file_id}/upload",
    tag = "files",
    params(
        ("org_id" = Uuid, Path, description = "Organization id"),
        ("project_id" = Uuid, Path, description = "Project id"),
        ("file_id" = Uuid, Path, description = "Reserved file id")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload staged, returns the relative path", body = String),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Upload failed", body = ErrorResponse)
    )
)]
pub async fn raw_upload(
    State(state): State<Arc<AppState>>,
    Path((org_id, project_id, file_id)): Path<(Uuid, Uuid, Uuid)>,
    multipart: Multipart,
) -> Result<Json<String>, HttpAppError> {
    let scope = FileScope::new(org_id, project_id);
    // Resolving the project also rejects uploads for unknown projects.
    state.projects.storage_config(org_id, project_id).await?;

    let received = receiver::receive(
        &state.local_store.root,
        &scope,
        file_id,
        &state.config,
        multipart,
    )
    .await?;

    Ok(Json(received.relative_path))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub original_name: String,
    pub relative_path: String,
    #[serde(default)]
    pub total_frames: Option<i64>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

#[utoipa::path(
    post,
    path = "/orgs/{org_id}/projects/{project_id}/files/{file_id}/complete",
    tag = "files",
    params(
        ("org_id" = Uuid, Path, description = "Organization id"),
        ("project_id" = Uuid, Path, description = "Project id"),
        ("file_id" = Uuid, Path, description = "Reserved file id")
    ),
    request_body = CompleteRequest,
    responses(
        (status = 201, description = "File record persisted", body = FileRecord),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Project or artifact not found", body = ErrorResponse),
        (status = 500, description = "Persistence failed", body = ErrorResponse)
    )
)]
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Path((org_id, project_id, file_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(request): Json<CompleteRequest>,
) -> Result<(StatusCode, Json<FileRecord>), HttpAppError> {
    split_name(&request.original_name)?;

    // A completed id already owns an artifact at this path; retrying must not
    // re-publish over it or delete it during compensation.
    let scope = FileScope::new(org_id, project_id);
    crate::services::ingest::ensure_unused_file_id(state.file_records.as_ref(), &scope, file_id)
        .await?;

    let expected_prefix = format!("/orgs/{}/projects/{}/files/", org_id, project_id);
    let stored_name = request
        .relative_path
        .strip_prefix(&expected_prefix)
        .filter(|rest| !rest.is_empty() && !rest.contains('/') && !rest.contains(".."))
        .ok_or_else(|| {
            AppError::Validation(format!(
                "relativePath must name a file under {}",
                expected_prefix
            ))
        })?
        .to_string();

    let storage = state.storage_for(org_id, project_id).await?;
    let storage_key = request.relative_path.trim_start_matches('/').to_string();
    let (_, extension) = split_name(&stored_name)?;

    // Local backend: the artifact must already sit at its staging path. Cloud
    // backends received the bytes directly via the signed upload URL.
    let url = if storage.backend() == StorageBackend::Local {
        let staged_path = state.local_store.root.join(&storage_key);
        crate::services::ingest::publisher::publish(
            storage.as_ref(),
            &staged_path,
            &storage_key,
            content_type_for_extension(&extension),
        )
        .await?
    } else {
        storage
            .finalize_retrieval_url(&storage_key)
            .await
            .map_err(storage_error_to_app)?
    };

    let record = FileRecord {
        id: file_id,
        org_id,
        project_id,
        original_name: request.original_name,
        stored_name,
        relative_path: request.relative_path,
        url,
        backend: storage.backend(),
        media_type: request.media_type,
        fps: request.fps,
        total_frames: request.total_frames,
        duration_seconds: request.duration,
        created_at: Utc::now(),
    };

    if let Err(e) = state.file_records.insert(&record).await {
        // Roll the artifact back so the client can retry from scratch.
        if let Err(cleanup_err) = storage.delete_artifact(&storage_key).await {
            tracing::warn!(
                key = %storage_key,
                error = %cleanup_err,
                "Failed to delete artifact after persistence error"
            );
        }
        return Err(e.into());
    }

    tracing::info!(
        file_id = %file_id,
        stored_name = %record.stored_name,
        backend = %record.backend,
        "File record persisted"
    );

    Ok((StatusCode::CREATED, Json(record)))
}
