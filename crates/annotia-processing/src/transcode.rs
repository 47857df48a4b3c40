//! Video re-encoding via ffmpeg.
//!
//! Staged raw video is re-encoded into H.264 in whatever container the
//! destination extension names, with AAC audio when the source had any. The
//! encoder streams its key/value progress into a side file the caller owns;
//! this crate only writes it, it never reads it back.

use crate::paths::{validate_and_canonicalize_path, validate_tool_path};
use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Failed to execute transcode tool: {0}")]
    Execution(String),

    #[error("Transcode tool failed: {0}")]
    ToolFailed(String),

    #[error("Transcode produced no output at {0}")]
    EmptyOutput(String),
}

/// One transcode invocation. Lives only for the duration of the call; the
/// caller deletes the progress file (and on failure the partial destination).
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub preserve_audio: bool,
    pub progress_path: PathBuf,
}

/// Re-encoding seam for the ingestion pipeline.
#[async_trait]
pub trait Transcode: Send + Sync {
    /// Re-encode `source_path` into `dest_path`. On success the destination
    /// exists and is non-empty; timing metadata of the output can differ from
    /// the source, so the caller should re-probe the destination.
    async fn transcode(&self, job: &TranscodeJob) -> Result<(), TranscodeError>;
}

pub struct FfmpegTranscoder {
    ffmpeg_path: String,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: String) -> anyhow::Result<Self> {
        validate_tool_path(&ffmpeg_path).context("Invalid ffmpeg path")?;
        Ok(Self { ffmpeg_path })
    }
}

fn build_args(job: &TranscodeJob) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        job.source_path.to_string_lossy().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
    ];

    if job.preserve_audio {
        args.extend_from_slice(&["-c:a".to_string(), "aac".to_string()]);
    } else {
        args.push("-an".to_string());
    }

    args.extend_from_slice(&[
        "-progress".to_string(),
        job.progress_path.to_string_lossy().to_string(),
    ]);
    args.push(job.dest_path.to_string_lossy().to_string());

    args
}

#[async_trait]
impl Transcode for FfmpegTranscoder {
    #[tracing::instrument(skip(self, job), fields(
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "transcode",
        source = %job.source_path.display(),
        dest = %job.dest_path.display()
    ))]
    async fn transcode(&self, job: &TranscodeJob) -> Result<(), TranscodeError> {
        let start = std::time::Instant::now();

        validate_and_canonicalize_path(&job.source_path)
            .and_then(|_| validate_and_canonicalize_path(&job.dest_path))
            .map_err(|e| TranscodeError::Execution(e.to_string()))?;

        let output = Command::new(&self.ffmpeg_path)
            .args(build_args(job))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| TranscodeError::Execution(e.to_string()))?;

        if !output.status.success() {
            return Err(TranscodeError::ToolFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        let dest_size = tokio::fs::metadata(&job.dest_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if dest_size == 0 {
            return Err(TranscodeError::EmptyOutput(
                job.dest_path.to_string_lossy().to_string(),
            ));
        }

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            dest_size_bytes = dest_size,
            preserve_audio = job.preserve_audio,
            "Transcode completed"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(preserve_audio: bool) -> TranscodeJob {
        TranscodeJob {
            source_path: PathBuf::from("/tmp/in_tmp.mov"),
            dest_path: PathBuf::from("/tmp/out.mp4"),
            preserve_audio,
            progress_path: PathBuf::from("/tmp/out_progress.json"),
        }
    }

    #[test]
    fn audio_is_reencoded_when_preserved() {
        let args = build_args(&job(true));
        let joined = args.join(" ");
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac"));
        assert!(!args.contains(&"-an".to_string()));
    }

    #[test]
    fn audio_is_stripped_when_absent() {
        let args = build_args(&job(false));
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.join(" ").contains("-c:a"));
    }

    #[test]
    fn progress_side_file_precedes_destination() {
        let args = build_args(&job(true));
        let progress_idx = args.iter().position(|a| a == "-progress").unwrap();
        assert_eq!(args[progress_idx + 1], "/tmp/out_progress.json");
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
    }

    #[test]
    fn tool_path_is_validated() {
        assert!(FfmpegTranscoder::new("ffmpeg; reboot".to_string()).is_err());
        assert!(FfmpegTranscoder::new("/usr/bin/ffmpeg".to_string()).is_ok());
    }
}
