//! HTTP error response conversion
//!
//! **Preferred handler pattern:** Return `Result<impl IntoResponse, HttpAppError>`.
//! Use `AppError` (or types that implement `Into<AppError>`) for errors and
//! `.map_err(Into::into)` so they become `HttpAppError` and render consistently
//! (status, body, logging).

use annotia_core::{AppError, LogLevel};
use annotia_processing::{ProbeError, TranscodeError};
use annotia_storage::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from annotia-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = Json(ErrorResponse {
            error: app_error.to_string(),
            code: app_error.error_code().to_string(),
            error_type: Some(app_error.error_type().to_string()),
        });

        (status, body).into_response()
    }
}

// Convert domain errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(storage_error_to_app(err))
    }
}

pub fn storage_error_to_app(err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(msg) => AppError::NotFound(msg),
        StorageError::UploadFailed(msg)
        | StorageError::DeleteFailed(msg)
        | StorageError::SigningFailed(msg)
        | StorageError::BackendError(msg) => AppError::BackendPublish(msg),
        StorageError::InvalidKey(msg) => AppError::Validation(msg),
        StorageError::IoError(err) => AppError::UploadIo(err.to_string()),
        StorageError::ConfigError(msg) => AppError::Internal(msg),
    }
}

impl From<ProbeError> for HttpAppError {
    fn from(err: ProbeError) -> Self {
        HttpAppError(AppError::Probe(err.to_string()))
    }
}

impl From<TranscodeError> for HttpAppError {
    fn from(err: TranscodeError) -> Self {
        HttpAppError(AppError::Transcode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_taxonomy() {
        let HttpAppError(app) = StorageError::NotFound("gone".to_string()).into();
        assert!(matches!(app, AppError::NotFound(_)));

        let HttpAppError(app) = StorageError::UploadFailed("s3 said no".to_string()).into();
        assert!(matches!(app, AppError::BackendPublish(_)));

        let HttpAppError(app) = StorageError::InvalidKey("..".to_string()).into();
        assert!(matches!(app, AppError::Validation(_)));
    }

    #[test]
    fn pipeline_errors_map_to_taxonomy() {
        let HttpAppError(app) = ProbeError::NoStreams.into();
        assert!(matches!(app, AppError::Probe(_)));
        assert_eq!(app.http_status_code(), 500);

        let HttpAppError(app) = TranscodeError::ToolFailed("exit 1".to_string()).into();
        assert!(matches!(app, AppError::Transcode(_)));
    }

    #[test]
    fn error_response_shape() {
        let response = ErrorResponse {
            error: "Media probe failed: no streams".to_string(),
            code: "PROBE_ERROR".to_string(),
            error_type: Some("Probe".to_string()),
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(
            json.get("code").and_then(|v| v.as_str()),
            Some("PROBE_ERROR")
        );
        assert!(json.get("error").and_then(|v| v.as_str()).is_some());
    }
}
