use annotia_core::models::{FileRecord, FileScope, MediaType};
use annotia_core::{AppError, StorageBackend};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Persistence seam for file records.
///
/// A record becomes visible to the rest of the platform the moment `insert`
/// commits; the ingestion pipeline calls it exactly once, as its final step.
#[async_trait]
pub trait FileRecordStore: Send + Sync {
    async fn insert(&self, record: &FileRecord) -> Result<(), AppError>;

    async fn get(&self, scope: &FileScope, file_id: Uuid) -> Result<Option<FileRecord>, AppError>;

    /// Delete a record. Deleting a missing record is not an error, so rollback
    /// of a speculative record stays idempotent.
    async fn delete(&self, scope: &FileScope, file_id: Uuid) -> Result<(), AppError>;

    async fn find_by_original_name(
        &self,
        scope: &FileScope,
        original_name: &str,
    ) -> Result<Option<FileRecord>, AppError>;
}

/// Repository for persisted file records
#[derive(Clone)]
pub struct FileRecordRepository {
    pool: PgPool,
}

impl FileRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FILE_COLUMNS: &str = "id, org_id, project_id, original_name, stored_name, relative_path, \
     url, backend, media_type, fps, total_frames, duration_seconds, created_at";

fn record_from_row(row: &PgRow) -> Result<FileRecord, AppError> {
    let backend: String = row.get("backend");
    let backend: StorageBackend = backend
        .parse()
        .map_err(|e: anyhow::Error| AppError::Database(e.to_string()))?;

    let media_type: String = row.get("media_type");
    let media_type: MediaType = media_type
        .parse()
        .map_err(|e: anyhow::Error| AppError::Database(e.to_string()))?;

    Ok(FileRecord {
        id: row.get("id"),
        org_id: row.get("org_id"),
        project_id: row.get("project_id"),
        original_name: row.get("original_name"),
        stored_name: row.get("stored_name"),
        relative_path: row.get("relative_path"),
        url: row.get("url"),
        backend,
        media_type,
        fps: row.get("fps"),
        total_frames: row.get("total_frames"),
        duration_seconds: row.get("duration_seconds"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl FileRecordStore for FileRecordRepository {
    async fn insert(&self, record: &FileRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO files (
                id, org_id, project_id, original_name, stored_name, relative_path,
                url, backend, media_type, fps, total_frames, duration_seconds, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id)
        .bind(record.org_id)
        .bind(record.project_id)
        .bind(&record.original_name)
        .bind(&record.stored_name)
        .bind(&record.relative_path)
        .bind(&record.url)
        .bind(record.backend.to_string())
        .bind(record.media_type.as_str())
        .bind(record.fps)
        .bind(record.total_frames)
        .bind(record.duration_seconds)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, scope: &FileScope, file_id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = $1 AND org_id = $2 AND project_id = $3"
        ))
        .bind(file_id)
        .bind(scope.org_id)
        .bind(scope.project_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    async fn delete(&self, scope: &FileScope, file_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM files WHERE id = $1 AND org_id = $2 AND project_id = $3",
        )
        .bind(file_id)
        .bind(scope.org_id)
        .bind(scope.project_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(file_id = %file_id, "File record deleted");
        }

        Ok(())
    }

    async fn find_by_original_name(
        &self,
        scope: &FileScope,
        original_name: &str,
    ) -> Result<Option<FileRecord>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files \
             WHERE org_id = $1 AND project_id = $2 AND original_name = $3 \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(scope.org_id)
        .bind(scope.project_id)
        .bind(original_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| record_from_row(&r)).transpose()
    }
}
