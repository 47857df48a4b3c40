//! Video ingestion state machine.
//!
//! Sequences probe, transcode, re-probe, publish, persist for one staged
//! video. Every stage error rolls back whatever the pipeline produced so far:
//! tmp raw file, partial transcode output, progress side file, the published
//! backend artifact, and any speculatively created record. Cleanup is
//! best-effort and never masks the original error.

use annotia_core::models::{FileRecord, FileScope, MediaType};
use annotia_core::AppError;
use annotia_db::FileRecordStore;
use annotia_processing::{Probe, Transcode, TranscodeJob};
use annotia_storage::{keys, Storage, StorageBackend};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::services::ingest::publisher;
use crate::services::ingest::receiver::ReceivedUpload;
use crate::services::ingest::types::{disambiguate, progress_file_name, split_name, stored_file_name};

const CANONICAL_VIDEO_EXT: &str = ".mp4";
const CANONICAL_VIDEO_CONTENT_TYPE: &str = "video/mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    Probed,
    Transcoding,
    Republished,
    Persisted,
}

pub struct IngestionOrchestrator {
    records: Arc<dyn FileRecordStore>,
    probe: Arc<dyn Probe>,
    transcoder: Arc<dyn Transcode>,
    transcode_permits: Arc<Semaphore>,
}

impl IngestionOrchestrator {
    pub fn new(
        records: Arc<dyn FileRecordStore>,
        probe: Arc<dyn Probe>,
        transcoder: Arc<dyn Transcode>,
        transcode_permits: Arc<Semaphore>,
    ) -> Self {
        Self {
            records,
            probe,
            transcoder,
            transcode_permits,
        }
    }

    /// Run the video pipeline for an already staged raw upload.
    ///
    /// On success the returned record is persisted and visible to the rest of
    /// the platform; on failure nothing is, and the staging directory holds no
    /// trace of this file id.
    pub async fn ingest_video(
        &self,
        scope: &FileScope,
        file_id: Uuid,
        storage: Arc<dyn Storage>,
        received: ReceivedUpload,
    ) -> Result<FileRecord, AppError> {
        // A finished ingestion already owns `{file_id}.mp4`; rerunning the
        // pipeline would overwrite and then roll back its artifact and record.
        // Only this request's staged upload is discarded.
        if let Err(err) =
            super::ensure_unused_file_id(self.records.as_ref(), scope, file_id).await
        {
            remove_if_exists(&received.staged_path).await;
            return Err(err);
        }

        let files_dir = received
            .staged_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| AppError::Internal("Staged file has no parent directory".to_string()))?;

        let mut plan = CleanupPlan {
            tmp_path: received.staged_path.clone(),
            dest_path: files_dir.join(stored_file_name(file_id, CANONICAL_VIDEO_EXT)),
            progress_path: files_dir.join(progress_file_name(file_id)),
            published_key: None,
            record_id: None,
        };

        match self
            .run(scope, file_id, storage.as_ref(), &received, &mut plan)
            .await
        {
            Ok(record) => Ok(record),
            Err((stage, err)) => {
                tracing::error!(
                    file_id = %file_id,
                    stage = ?stage,
                    error = %err,
                    "Video ingestion failed, rolling back"
                );
                plan.run(storage.as_ref(), self.records.as_ref(), scope, file_id)
                    .await;
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        scope: &FileScope,
        file_id: Uuid,
        storage: &dyn Storage,
        received: &ReceivedUpload,
        plan: &mut CleanupPlan,
    ) -> Result<FileRecord, (Stage, AppError)> {
        let mut stage = Stage::Received;

        let raw_report = self
            .probe
            .probe(&plan.tmp_path)
            .await
            .map_err(|e| (stage, AppError::Probe(e.to_string())))?;
        stage = Stage::Probed;

        let permit = self
            .transcode_permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| (stage, AppError::Internal(e.to_string())))?;
        stage = Stage::Transcoding;

        let job = TranscodeJob {
            source_path: plan.tmp_path.clone(),
            dest_path: plan.dest_path.clone(),
            preserve_audio: raw_report.has_audio,
            progress_path: plan.progress_path.clone(),
        };
        let transcode_result = self.transcoder.transcode(&job).await;
        drop(permit);
        transcode_result.map_err(|e| (stage, AppError::Transcode(e.to_string())))?;

        // The re-encode can shift exact timing, so the record carries the
        // destination's numbers, not the raw upload's.
        let final_report = self
            .probe
            .probe(&plan.dest_path)
            .await
            .map_err(|e| (stage, AppError::Probe(e.to_string())))?;

        let original_name = self
            .disambiguated_name(scope, &received.original_filename)
            .await
            .map_err(|e| (stage, e))?;

        let published_name = match storage.backend() {
            StorageBackend::Local => stored_file_name(file_id, CANONICAL_VIDEO_EXT),
            _ => cloud_video_name(&original_name),
        };
        let storage_key = keys::file_key(scope, &published_name);

        let url = publisher::publish(
            storage,
            &plan.dest_path,
            &storage_key,
            CANONICAL_VIDEO_CONTENT_TYPE,
        )
        .await
        .map_err(|e| (stage, e))?;
        plan.published_key = Some(storage_key.clone());
        stage = Stage::Republished;

        remove_if_exists(&plan.tmp_path).await;
        remove_if_exists(&plan.progress_path).await;

        let summary = final_report.summary();
        let record = FileRecord {
            id: file_id,
            org_id: scope.org_id,
            project_id: scope.project_id,
            original_name,
            stored_name: published_name,
            relative_path: format!("/{}", storage_key),
            url,
            backend: storage.backend(),
            media_type: MediaType::Video,
            fps: summary.fps,
            total_frames: summary.total_frames,
            duration_seconds: summary.duration_seconds,
            created_at: Utc::now(),
        };

        self.records
            .insert(&record)
            .await
            .map_err(|e| (stage, e))?;
        // The record only becomes rollback state once it actually exists; a
        // failed insert leaves nothing of ours to delete.
        plan.record_id = Some(file_id);
        stage = Stage::Persisted;

        tracing::info!(
            file_id = %file_id,
            stage = ?stage,
            backend = %record.backend,
            fps = record.fps,
            total_frames = record.total_frames,
            "Video ingestion persisted"
        );

        Ok(record)
    }

    async fn disambiguated_name(
        &self,
        scope: &FileScope,
        original_filename: &str,
    ) -> Result<String, AppError> {
        let (stem, ext) = split_name(original_filename)?;

        match self
            .records
            .find_by_original_name(scope, original_filename)
            .await?
        {
            Some(_) => Ok(disambiguate(&stem, &ext)),
            None => Ok(original_filename.to_string()),
        }
    }
}

fn cloud_video_name(original_name: &str) -> String {
    match original_name.rsplit_once('.') {
        Some((stem, _)) => format!("{}{}", stem, CANONICAL_VIDEO_EXT),
        None => format!("{}{}", original_name, CANONICAL_VIDEO_EXT),
    }
}

/// Everything a failed ingestion may have left behind.
pub(crate) struct CleanupPlan {
    pub tmp_path: PathBuf,
    pub dest_path: PathBuf,
    pub progress_path: PathBuf,
    pub published_key: Option<String>,
    pub record_id: Option<Uuid>,
}

impl CleanupPlan {
    /// Best-effort rollback. Missing files are fine, so running this twice is
    /// a no-op the second time. Failures are logged, never propagated.
    pub async fn run(
        &self,
        storage: &dyn Storage,
        records: &dyn FileRecordStore,
        scope: &FileScope,
        file_id: Uuid,
    ) {
        remove_if_exists(&self.tmp_path).await;
        remove_if_exists(&self.dest_path).await;
        remove_if_exists(&self.progress_path).await;

        if let Some(ref key) = self.published_key {
            if let Err(e) = storage.delete_artifact(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to delete published artifact during rollback");
            }
        }

        if self.record_id.is_some() {
            if let Err(e) = records.delete(scope, file_id).await {
                tracing::warn!(file_id = %file_id, error = %e, "Failed to delete file record during rollback");
            }
        }
    }
}

async fn remove_if_exists(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove pipeline file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotia_processing::{ProbeError, ProbeReport, TranscodeError};
    use annotia_storage::LocalStorage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    struct MemoryRecords {
        rows: Mutex<HashMap<Uuid, FileRecord>>,
        fail_insert: bool,
    }

    impl MemoryRecords {
        fn new() -> Self {
            Self {
                rows: Mutex::new(HashMap::new()),
                fail_insert: false,
            }
        }

        fn failing_insert() -> Self {
            Self {
                rows: Mutex::new(HashMap::new()),
                fail_insert: true,
            }
        }
    }

    #[async_trait]
    impl FileRecordStore for MemoryRecords {
        async fn insert(&self, record: &FileRecord) -> Result<(), AppError> {
            if self.fail_insert {
                return Err(AppError::Database("connection lost".to_string()));
            }
            let mut rows = self.rows.lock().unwrap();
            if rows.contains_key(&record.id) {
                // Same failure mode as the files table primary key.
                return Err(AppError::Database(
                    "duplicate key value violates unique constraint".to_string(),
                ));
            }
            rows.insert(record.id, record.clone());
            Ok(())
        }

        async fn get(
            &self,
            _scope: &FileScope,
            file_id: Uuid,
        ) -> Result<Option<FileRecord>, AppError> {
            Ok(self.rows.lock().unwrap().get(&file_id).cloned())
        }

        async fn delete(&self, _scope: &FileScope, file_id: Uuid) -> Result<(), AppError> {
            self.rows.lock().unwrap().remove(&file_id);
            Ok(())
        }

        async fn find_by_original_name(
            &self,
            _scope: &FileScope,
            original_name: &str,
        ) -> Result<Option<FileRecord>, AppError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .find(|r| r.original_name == original_name)
                .cloned())
        }
    }

    struct FakeProbe {
        has_audio: bool,
        no_streams: bool,
    }

    #[async_trait]
    impl Probe for FakeProbe {
        async fn probe(&self, _media_path: &Path) -> Result<ProbeReport, ProbeError> {
            if self.no_streams {
                return Err(ProbeError::NoStreams);
            }
            Ok(ProbeReport {
                has_video: true,
                has_audio: self.has_audio,
                width: Some(1280),
                height: Some(720),
                codec: Some("h264".to_string()),
                fps: Some(30.0),
                duration_seconds: Some(2.0),
                frame_count: Some(60),
            })
        }
    }

    struct FakeTranscoder {
        fail: bool,
    }

    #[async_trait]
    impl Transcode for FakeTranscoder {
        async fn transcode(&self, job: &TranscodeJob) -> Result<(), TranscodeError> {
            tokio::fs::write(&job.progress_path, b"frame=60\nprogress=end\n")
                .await
                .map_err(|e| TranscodeError::Execution(e.to_string()))?;
            if self.fail {
                // Leave a partial destination behind, as a crashed encoder would.
                tokio::fs::write(&job.dest_path, b"partial")
                    .await
                    .map_err(|e| TranscodeError::Execution(e.to_string()))?;
                return Err(TranscodeError::ToolFailed("exit 1".to_string()));
            }
            tokio::fs::write(&job.dest_path, b"encoded video")
                .await
                .map_err(|e| TranscodeError::Execution(e.to_string()))?;
            Ok(())
        }
    }

    struct Harness {
        _dir: TempDir,
        root: PathBuf,
        scope: FileScope,
        file_id: Uuid,
        storage: Arc<dyn Storage>,
        records: Arc<MemoryRecords>,
    }

    async fn harness(records: MemoryRecords) -> Harness {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(root.clone(), String::new())
                .await
                .unwrap(),
        );
        Harness {
            _dir: dir,
            root,
            scope: FileScope::new(Uuid::new_v4(), Uuid::new_v4()),
            file_id: Uuid::new_v4(),
            storage,
            records: Arc::new(records),
        }
    }

    async fn stage_raw_upload(h: &Harness) -> ReceivedUpload {
        let files_dir = h.root.join(format!(
            "orgs/{}/projects/{}/files",
            h.scope.org_id, h.scope.project_id
        ));
        tokio::fs::create_dir_all(&files_dir).await.unwrap();
        let staged_path = files_dir.join(format!("{}_tmp.mov", h.file_id));
        tokio::fs::write(&staged_path, b"raw camera bytes")
            .await
            .unwrap();

        ReceivedUpload {
            staged_path,
            relative_path: format!(
                "/orgs/{}/projects/{}/files/{}.mov",
                h.scope.org_id, h.scope.project_id, h.file_id
            ),
            stored_name: format!("{}.mov", h.file_id),
            original_filename: "clip.mov".to_string(),
            extension: ".mov".to_string(),
            media_type: MediaType::Video,
            size_bytes: 16,
        }
    }

    fn orchestrator(
        h: &Harness,
        probe: FakeProbe,
        transcoder: FakeTranscoder,
    ) -> IngestionOrchestrator {
        IngestionOrchestrator::new(
            h.records.clone(),
            Arc::new(probe),
            Arc::new(transcoder),
            Arc::new(Semaphore::new(2)),
        )
    }

    async fn files_matching_id(h: &Harness) -> Vec<String> {
        let files_dir = h.root.join(format!(
            "orgs/{}/projects/{}/files",
            h.scope.org_id, h.scope.project_id
        ));
        let mut matches = Vec::new();
        let mut entries = tokio::fs::read_dir(&files_dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.contains(&h.file_id.to_string()) {
                matches.push(name);
            }
        }
        matches
    }

    #[tokio::test]
    async fn successful_ingest_persists_record_and_tidies_staging() {
        let h = harness(MemoryRecords::new()).await;
        let received = stage_raw_upload(&h).await;
        let orch = orchestrator(
            &h,
            FakeProbe {
                has_audio: true,
                no_streams: false,
            },
            FakeTranscoder { fail: false },
        );

        let record = orch
            .ingest_video(&h.scope, h.file_id, h.storage.clone(), received)
            .await
            .unwrap();

        assert_eq!(record.media_type, MediaType::Video);
        assert_eq!(record.fps, Some(30.0));
        assert_eq!(record.total_frames, Some(60));
        assert_eq!(record.duration_seconds, Some(2.0));
        assert_eq!(record.original_name, "clip.mov");

        // Only the canonical artifact remains; tmp and progress are gone.
        let leftovers = files_matching_id(&h).await;
        assert_eq!(leftovers, vec![format!("{}.mp4", h.file_id)]);

        assert!(h
            .records
            .get(&h.scope, h.file_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn transcode_failure_rolls_back_everything() {
        let h = harness(MemoryRecords::new()).await;
        let received = stage_raw_upload(&h).await;
        let orch = orchestrator(
            &h,
            FakeProbe {
                has_audio: false,
                no_streams: false,
            },
            FakeTranscoder { fail: true },
        );

        let result = orch
            .ingest_video(&h.scope, h.file_id, h.storage.clone(), received)
            .await;

        assert!(matches!(result, Err(AppError::Transcode(_))));
        assert!(files_matching_id(&h).await.is_empty());
        assert!(h
            .records
            .get(&h.scope, h.file_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn probe_without_streams_aborts_before_transcode() {
        let h = harness(MemoryRecords::new()).await;
        let received = stage_raw_upload(&h).await;
        let orch = orchestrator(
            &h,
            FakeProbe {
                has_audio: false,
                no_streams: true,
            },
            FakeTranscoder { fail: false },
        );

        let result = orch
            .ingest_video(&h.scope, h.file_id, h.storage.clone(), received)
            .await;

        assert!(matches!(result, Err(AppError::Probe(_))));
        assert!(files_matching_id(&h).await.is_empty());
    }

    #[tokio::test]
    async fn persist_failure_deletes_published_artifact() {
        let h = harness(MemoryRecords::failing_insert()).await;
        let received = stage_raw_upload(&h).await;
        let orch = orchestrator(
            &h,
            FakeProbe {
                has_audio: true,
                no_streams: false,
            },
            FakeTranscoder { fail: false },
        );

        let result = orch
            .ingest_video(&h.scope, h.file_id, h.storage.clone(), received)
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(files_matching_id(&h).await.is_empty());
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let h = harness(MemoryRecords::new()).await;
        let received = stage_raw_upload(&h).await;
        let files_dir = received.staged_path.parent().unwrap().to_path_buf();

        let plan = CleanupPlan {
            tmp_path: received.staged_path.clone(),
            dest_path: files_dir.join(format!("{}.mp4", h.file_id)),
            progress_path: files_dir.join(format!("{}_progress.json", h.file_id)),
            published_key: None,
            record_id: Some(h.file_id),
        };

        plan.run(
            h.storage.as_ref(),
            h.records.as_ref(),
            &h.scope,
            h.file_id,
        )
        .await;
        assert!(files_matching_id(&h).await.is_empty());

        // Second pass finds nothing to delete and must not blow up.
        plan.run(
            h.storage.as_ref(),
            h.records.as_ref(),
            &h.scope,
            h.file_id,
        )
        .await;
        assert!(files_matching_id(&h).await.is_empty());
    }

    #[tokio::test]
    async fn reused_file_id_is_rejected_without_touching_first_ingestion() {
        let h = harness(MemoryRecords::new()).await;
        let first = stage_raw_upload(&h).await;
        let orch = orchestrator(
            &h,
            FakeProbe {
                has_audio: true,
                no_streams: false,
            },
            FakeTranscoder { fail: false },
        );
        let first_record = orch
            .ingest_video(&h.scope, h.file_id, h.storage.clone(), first)
            .await
            .unwrap();

        // Same id arrives again with fresh raw bytes.
        let second_upload = stage_raw_upload(&h).await;
        let result = orch
            .ingest_video(&h.scope, h.file_id, h.storage.clone(), second_upload)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));

        // The first ingestion's record and artifact survive; only the second
        // request's staged upload is gone.
        let surviving = h.records.get(&h.scope, h.file_id).await.unwrap();
        assert_eq!(surviving.map(|r| r.url), Some(first_record.url));
        assert_eq!(
            files_matching_id(&h).await,
            vec![format!("{}.mp4", h.file_id)]
        );
        let artifact = h.root.join(format!(
            "orgs/{}/projects/{}/files/{}.mp4",
            h.scope.org_id, h.scope.project_id, h.file_id
        ));
        assert_eq!(tokio::fs::read(&artifact).await.unwrap(), b"encoded video");
    }

    #[tokio::test]
    async fn used_file_id_fails_the_reuse_guard() {
        let h = harness(MemoryRecords::new()).await;
        let received = stage_raw_upload(&h).await;
        let orch = orchestrator(
            &h,
            FakeProbe {
                has_audio: true,
                no_streams: false,
            },
            FakeTranscoder { fail: false },
        );
        orch.ingest_video(&h.scope, h.file_id, h.storage.clone(), received)
            .await
            .unwrap();

        let result =
            crate::services::ingest::ensure_unused_file_id(h.records.as_ref(), &h.scope, h.file_id)
                .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let fresh = crate::services::ingest::ensure_unused_file_id(
            h.records.as_ref(),
            &h.scope,
            Uuid::new_v4(),
        )
        .await;
        assert!(fresh.is_ok());
    }

    #[tokio::test]
    async fn duplicate_original_name_is_disambiguated() {
        let h = harness(MemoryRecords::new()).await;

        let first = stage_raw_upload(&h).await;
        let orch = orchestrator(
            &h,
            FakeProbe {
                has_audio: true,
                no_streams: false,
            },
            FakeTranscoder { fail: false },
        );
        let first_record = orch
            .ingest_video(&h.scope, h.file_id, h.storage.clone(), first)
            .await
            .unwrap();

        let mut h2 = harness(MemoryRecords::new()).await;
        // Same scope and records as the first upload, fresh file id.
        h2.scope = h.scope;
        h2.root = h.root.clone();
        h2.storage = h.storage.clone();
        h2.records = h.records.clone();
        let second_upload = stage_raw_upload(&h2).await;

        let orch2 = IngestionOrchestrator::new(
            h2.records.clone(),
            Arc::new(FakeProbe {
                has_audio: true,
                no_streams: false,
            }),
            Arc::new(FakeTranscoder { fail: false }),
            Arc::new(Semaphore::new(2)),
        );
        let second_record = orch2
            .ingest_video(&h2.scope, h2.file_id, h2.storage.clone(), second_upload)
            .await
            .unwrap();

        assert_ne!(first_record.id, second_record.id);
        assert_ne!(first_record.original_name, second_record.original_name);
        assert!(second_record.original_name.starts_with("clip-"));
    }
}
