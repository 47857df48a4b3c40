//! Media inspection via ffprobe.

use crate::paths::{validate_and_canonicalize_path, validate_tool_path};
use annotia_core::models::ProbeSummary;
use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to execute probe tool: {0}")]
    Execution(String),

    #[error("Probe tool failed: {0}")]
    ToolFailed(String),

    #[error("Failed to parse probe output: {0}")]
    Parse(String),

    #[error("No streams found in media")]
    NoStreams,
}

/// What the probe learned about one staged media file.
///
/// Consumed immediately by the ingestion pipeline; only the timing subset is
/// copied into the persisted file record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub has_video: bool,
    pub has_audio: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
    pub fps: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub frame_count: Option<i64>,
}

impl ProbeReport {
    /// Parse the JSON document ffprobe prints with `-show_format -show_streams`.
    ///
    /// The video stream is the first stream typed `video`, falling back to the
    /// first stream overall when none is typed. Frame count falls back to
    /// `round(duration * fps)` when the stream does not report one, and
    /// duration falls back to the container-level value.
    pub fn from_json(probe_data: &serde_json::Value) -> Result<Self, ProbeError> {
        let streams = probe_data["streams"].as_array().filter(|s| !s.is_empty());
        let streams = streams.ok_or(ProbeError::NoStreams)?;

        let video_stream = streams
            .iter()
            .find(|s| s["codec_type"].as_str() == Some("video"));
        let has_video = video_stream.is_some();
        let has_audio = streams
            .iter()
            .any(|s| s["codec_type"].as_str() == Some("audio"));

        let stream = video_stream.unwrap_or(&streams[0]);
        let format = &probe_data["format"];

        let fps = stream["r_frame_rate"].as_str().and_then(parse_rational);

        let duration_seconds = parse_float_field(&stream["duration"])
            .or_else(|| parse_float_field(&format["duration"]));

        let frame_count = parse_int_field(&stream["nb_frames"]).or_else(|| {
            match (duration_seconds, fps) {
                (Some(duration), Some(fps)) => Some((duration * fps).round() as i64),
                _ => None,
            }
        });

        Ok(ProbeReport {
            has_video,
            has_audio,
            width: stream["width"].as_u64().map(|w| w as u32),
            height: stream["height"].as_u64().map(|h| h as u32),
            codec: stream["codec_name"].as_str().map(str::to_string),
            fps,
            duration_seconds,
            frame_count,
        })
    }

    /// The subset of the report that ends up on the file record.
    pub fn summary(&self) -> ProbeSummary {
        ProbeSummary {
            fps: self.fps,
            total_frames: self.frame_count,
            duration_seconds: self.duration_seconds,
        }
    }
}

fn parse_rational(r: &str) -> Option<f64> {
    let (num, den) = r.split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den != 0.0 {
        Some(num / den)
    } else {
        None
    }
}

// ffprobe reports numbers as JSON strings.
fn parse_float_field(value: &serde_json::Value) -> Option<f64> {
    value.as_str().and_then(|v| v.parse().ok())
}

fn parse_int_field(value: &serde_json::Value) -> Option<i64> {
    value.as_str().and_then(|v| v.parse().ok())
}

/// Media inspection seam for the ingestion pipeline.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, media_path: &Path) -> Result<ProbeReport, ProbeError>;
}

pub struct FfprobeProbe {
    ffprobe_path: String,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: String) -> anyhow::Result<Self> {
        validate_tool_path(&ffprobe_path).context("Invalid ffprobe path")?;
        Ok(Self { ffprobe_path })
    }
}

#[async_trait]
impl Probe for FfprobeProbe {
    #[tracing::instrument(skip(self), fields(
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    async fn probe(&self, media_path: &Path) -> Result<ProbeReport, ProbeError> {
        let start = std::time::Instant::now();

        let validated_path = validate_and_canonicalize_path(media_path)
            .map_err(|e| ProbeError::Execution(e.to_string()))?;

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(&validated_path)
            .output()
            .await
            .map_err(|e| ProbeError::Execution(e.to_string()))?;

        if !output.status.success() {
            return Err(ProbeError::ToolFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        let probe_data: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ProbeError::Parse(e.to_string()))?;

        let report = ProbeReport::from_json(&probe_data)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            has_video = report.has_video,
            has_audio = report.has_audio,
            fps = report.fps,
            media_duration = report.duration_seconds,
            "Media probe completed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_video_with_audio() {
        let data = json!({
            "streams": [
                {
                    "codec_type": "audio",
                    "codec_name": "aac"
                },
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "r_frame_rate": "30000/1001",
                    "duration": "10.010000",
                    "nb_frames": "300"
                }
            ],
            "format": { "duration": "10.031000" }
        });

        let report = ProbeReport::from_json(&data).unwrap();
        assert!(report.has_video);
        assert!(report.has_audio);
        assert_eq!(report.width, Some(1920));
        assert_eq!(report.height, Some(1080));
        assert_eq!(report.codec.as_deref(), Some("h264"));
        assert!((report.fps.unwrap() - 29.97).abs() < 0.01);
        assert_eq!(report.frame_count, Some(300));
        assert_eq!(report.duration_seconds, Some(10.01));
    }

    #[test]
    fn frame_count_falls_back_to_duration_times_fps() {
        let data = json!({
            "streams": [
                {
                    "codec_type": "video",
                    "r_frame_rate": "25/1",
                    "duration": "4.0"
                }
            ],
            "format": {}
        });

        let report = ProbeReport::from_json(&data).unwrap();
        assert_eq!(report.frame_count, Some(100));
    }

    #[test]
    fn duration_falls_back_to_container_level() {
        let data = json!({
            "streams": [
                { "codec_type": "video", "r_frame_rate": "24/1" }
            ],
            "format": { "duration": "2.5" }
        });

        let report = ProbeReport::from_json(&data).unwrap();
        assert_eq!(report.duration_seconds, Some(2.5));
        assert_eq!(report.frame_count, Some(60));
    }

    #[test]
    fn untyped_first_stream_is_used_when_no_video_stream() {
        let data = json!({
            "streams": [
                { "codec_name": "mjpeg", "width": 640, "height": 480 }
            ],
            "format": {}
        });

        let report = ProbeReport::from_json(&data).unwrap();
        assert!(!report.has_video);
        assert!(!report.has_audio);
        assert_eq!(report.width, Some(640));
    }

    #[test]
    fn zero_streams_is_fatal() {
        let empty = json!({ "streams": [], "format": {} });
        assert!(matches!(
            ProbeReport::from_json(&empty),
            Err(ProbeError::NoStreams)
        ));

        let missing = json!({ "format": {} });
        assert!(matches!(
            ProbeReport::from_json(&missing),
            Err(ProbeError::NoStreams)
        ));
    }

    #[test]
    fn zero_denominator_frame_rate_is_ignored() {
        assert_eq!(parse_rational("30/0"), None);
        assert_eq!(parse_rational("30"), None);
        assert_eq!(parse_rational("60/2"), Some(30.0));
    }
}
