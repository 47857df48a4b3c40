//! OpenAPI document assembly.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::healthz,
        crate::handlers::files::upload_url,
        crate::handlers::files::raw_upload,
        crate::handlers::files::complete,
        crate::handlers::videos::ingest_video,
    ),
    components(schemas(
        crate::error::ErrorResponse,
        crate::handlers::health::HealthResponse,
        crate::handlers::files::UploadUrlRequest,
        crate::handlers::files::UploadUrlResponse,
        crate::handlers::files::CompleteRequest,
        annotia_core::models::FileRecord,
        annotia_core::models::MediaType,
        annotia_core::StorageBackend,
    )),
    tags(
        (name = "files", description = "Upload target issuance and file completion"),
        (name = "videos", description = "Full video ingestion pipeline"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Annotia ingestion API",
        description = "Media ingestion for the annotation platform: upload target issuance, raw upload staging, video transcoding, and backend publishing."
    )
)]
pub struct ApiDoc;
