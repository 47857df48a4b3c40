pub mod file_record;
pub mod project;

pub use file_record::{FileRecord, FileScope, MediaType, ProbeSummary};
pub use project::{AzureBlobSettings, ProjectStorageConfig, S3Settings};
