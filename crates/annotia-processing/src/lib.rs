//! Annotia media processing
//!
//! Thin wrappers around external tools: ffprobe for media inspection and
//! ffmpeg for re-encoding staged video into the canonical container. Both are
//! exposed behind traits so the ingestion pipeline can be tested without the
//! tools installed.

pub mod paths;
pub mod probe;
pub mod transcode;

pub use probe::{FfprobeProbe, Probe, ProbeError, ProbeReport};
pub use transcode::{FfmpegTranscoder, Transcode, TranscodeError, TranscodeJob};
