//! Annotia storage backends
//!
//! One `Storage` trait, three variants: local filesystem, S3-compatible object
//! store, and Azure-like blob store. The variant is selected once per project
//! by the factory and injected into the ingestion pipeline; call sites never
//! re-test which backend they are talking to.
//!
//! # Storage key format
//!
//! All backends share the same key layout:
//!
//! `orgs/{org_id}/projects/{project_id}/files/{stored_name}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so the staging directory and every backend agree.

pub mod azure;
pub mod factory;
pub mod keys;
pub mod local;
pub mod s3;
pub mod traits;

pub use annotia_core::StorageBackend;
pub use azure::AzureBlobStorage;
pub use factory::{storage_for_project, LocalStoreSettings, SasExpiry};
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
