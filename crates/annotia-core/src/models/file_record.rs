use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage_types::StorageBackend;

/// Media type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl std::str::FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            _ => Err(anyhow::anyhow!("Invalid media type: {}", s)),
        }
    }
}

/// Org/project addressing for one file. Every storage key and staging path is
/// scoped by this pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileScope {
    pub org_id: Uuid,
    pub project_id: Uuid,
}

impl FileScope {
    pub fn new(org_id: Uuid, project_id: Uuid) -> Self {
        Self { org_id, project_id }
    }
}

/// Persisted file record: one ingested media asset.
///
/// A record exists only once the whole pipeline has succeeded; there is no
/// partially-ingested visible state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub project_id: Uuid,
    pub original_name: String,
    pub stored_name: String,
    /// Staging-relative path, e.g. `/orgs/{org}/projects/{project}/files/{stored_name}`
    pub relative_path: String,
    /// Retrieval address: static relative path for the local backend, a signed
    /// URL for cloud backends.
    pub url: String,
    pub backend: StorageBackend,
    pub media_type: MediaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Video timing metadata copied into the file record on success.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProbeSummary {
    pub fps: Option<f64>,
    pub total_frames: Option<i64>,
    pub duration_seconds: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_record_serializes_camel_case() {
        let record = FileRecord {
            id: Uuid::nil(),
            org_id: Uuid::nil(),
            project_id: Uuid::nil(),
            original_name: "cat.png".into(),
            stored_name: "00000000-0000-0000-0000-000000000000.png".into(),
            relative_path: "/orgs/o/projects/p/files/f.png".into(),
            url: "/orgs/o/projects/p/files/f.png".into(),
            backend: StorageBackend::Local,
            media_type: MediaType::Image,
            fps: None,
            total_frames: None,
            duration_seconds: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["originalName"], "cat.png");
        assert_eq!(json["backend"], "local");
        assert_eq!(json["mediaType"], "image");
        assert!(json.get("fps").is_none());
    }

    #[test]
    fn video_record_carries_timing_metadata() {
        let record = FileRecord {
            id: Uuid::nil(),
            org_id: Uuid::nil(),
            project_id: Uuid::nil(),
            original_name: "clip.mp4".into(),
            stored_name: "f.mp4".into(),
            relative_path: "/orgs/o/projects/p/files/f.mp4".into(),
            url: "https://example/signed".into(),
            backend: StorageBackend::ObjectStore,
            media_type: MediaType::Video,
            fps: Some(29.97),
            total_frames: Some(899),
            duration_seconds: Some(30.0),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["backend"], "object-store");
        assert_eq!(json["totalFrames"], 899);
        assert_eq!(json["durationSeconds"], 30.0);
    }
}
