//! The ingestion pipeline
//!
//! Four cooperating pieces: `issuer` hands out upload targets, `receiver`
//! streams raw bytes onto the staging disk, `publisher` mirrors finished
//! artifacts into the project's backend, and `orchestrator` sequences the
//! video pipeline (probe, transcode, re-probe, publish, persist) with
//! rollback on failure.

pub mod issuer;
pub mod orchestrator;
pub mod publisher;
pub mod receiver;
pub mod types;

pub use issuer::UploadTargetIssuer;
pub use orchestrator::IngestionOrchestrator;

use annotia_core::models::FileScope;
use annotia_core::AppError;
use annotia_db::FileRecordStore;
use uuid::Uuid;

/// Reject reuse of a file id that already has a persisted record.
///
/// Rollback of a failed ingestion only compensates for state that ingestion
/// created; letting a finished id back into the pipeline would put the first
/// ingestion's record and artifact in the blast radius.
pub async fn ensure_unused_file_id(
    records: &dyn FileRecordStore,
    scope: &FileScope,
    file_id: Uuid,
) -> Result<(), AppError> {
    match records.get(scope, file_id).await? {
        Some(_) => Err(AppError::Validation(format!(
            "File {} has already been ingested",
            file_id
        ))),
        None => Ok(()),
    }
}
