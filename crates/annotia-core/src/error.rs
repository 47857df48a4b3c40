//! Error types module
//!
//! All ingestion errors are unified under the `AppError` enum so that the HTTP
//! layer can render a consistent response (status, machine-readable code,
//! message) for any failure in the pipeline.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Upload failed: {0}")]
    UploadIo(String),

    #[error("Media probe failed: {0}")]
    Probe(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Backend publish failed: {0}")]
    BackendPublish(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// HTTP status code to return for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            AppError::ProjectNotFound(_) | AppError::NotFound(_) => 404,
            AppError::Validation(_) => 400,
            AppError::PayloadTooLarge(_) => 413,
            AppError::UploadIo(_)
            | AppError::Probe(_)
            | AppError::Transcode(_)
            | AppError::BackendPublish(_)
            | AppError::Database(_)
            | AppError::Internal(_)
            | AppError::InternalWithSource { .. } => 500,
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::ProjectNotFound(_) => "PROJECT_NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UploadIo(_) => "UPLOAD_IO_ERROR",
            AppError::Probe(_) => "PROBE_ERROR",
            AppError::Transcode(_) => "TRANSCODE_ERROR",
            AppError::BackendPublish(_) => "BACKEND_PUBLISH_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "INTERNAL_ERROR",
        }
    }

    /// Error type name for structured logging
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::ProjectNotFound(_) => "ProjectNotFound",
            AppError::Validation(_) => "Validation",
            AppError::UploadIo(_) => "UploadIo",
            AppError::Probe(_) => "Probe",
            AppError::Transcode(_) => "Transcode",
            AppError::BackendPublish(_) => "BackendPublish",
            AppError::Database(_) => "Database",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        match self {
            AppError::Validation(_)
            | AppError::NotFound(_)
            | AppError::ProjectNotFound(_)
            | AppError::PayloadTooLarge(_) => LogLevel::Debug,
            AppError::UploadIo(_) => LogLevel::Warn,
            AppError::Probe(_)
            | AppError::Transcode(_)
            | AppError::BackendPublish(_)
            | AppError::Database(_)
            | AppError::Internal(_)
            | AppError::InternalWithSource { .. } => LogLevel::Error,
        }
    }
}

// Gated behind the `sqlx` feature so non-database crates stay lean.
#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}
