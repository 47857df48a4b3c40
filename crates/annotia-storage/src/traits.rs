//! Storage abstraction trait
//!
//! This module defines the `Storage` trait that all storage backends
//! implement: reserve an upload target, finalize a retrieval URL, publish a
//! local artifact, and delete an artifact.

use annotia_core::models::FileScope;
use annotia_core::StorageBackend;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// The ingestion pipeline works against this trait without coupling to a
/// specific backend. Signing and network failures are surfaced unmodified;
/// no operation retries internally.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Produce the address a client uploads to.
    ///
    /// Cloud backends return a time-limited signed write URL; the local
    /// backend returns the server-relative upload endpoint path for the file.
    async fn reserve_upload_target(
        &self,
        scope: &FileScope,
        file_id: Uuid,
        stored_name: &str,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Resolve the retrieval address for a stored key.
    ///
    /// The local backend returns a stable relative path; cloud backends return
    /// a freshly signed read URL on every call.
    async fn finalize_retrieval_url(&self, storage_key: &str) -> StorageResult<String>;

    /// Upload a finalized local artifact into the backend under `storage_key`.
    ///
    /// For the local backend this is a no-op beyond verifying the artifact is
    /// in place: the staging path is its final resting place.
    async fn publish_local_artifact(
        &self,
        local_path: &Path,
        storage_key: &str,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Delete an artifact. Deleting a missing artifact is not an error.
    async fn delete_artifact(&self, storage_key: &str) -> StorageResult<()>;

    /// The backend variant this storage implements.
    fn backend(&self) -> StorageBackend;
}
