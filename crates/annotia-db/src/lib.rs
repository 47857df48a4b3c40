//! Database repositories for the ingestion subsystem
//!
//! Two repositories: `FileRecordRepository` (the persisted file records that
//! the rest of the platform sees) and `ProjectRepository` (read-only lookup of
//! a project's storage configuration). Both use dynamic sqlx queries so no
//! DATABASE_URL is needed at compile time.

pub mod files;
pub mod pool;
pub mod projects;

pub use files::{FileRecordRepository, FileRecordStore};
pub use pool::connect;
pub use projects::{ProjectDirectory, ProjectRepository};
