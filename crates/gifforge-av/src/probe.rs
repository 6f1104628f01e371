//! Video metadata probing.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use gifforge_common::{Dimensions, VideoMetadata};
use serde::Deserialize;
use tracing::debug;

use crate::command::ToolCommand;
use crate::tools::get_tool_path;
use crate::{Error, Result};

const TOOL: &str = "ffprobe";

/// Source of duration and pixel dimensions for a video byte buffer.
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    async fn probe(&self, data: &[u8]) -> Result<VideoMetadata>;
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// [`MetadataProbe`] backed by the ffprobe command-line tool.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    configured_path: Option<PathBuf>,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new() -> Self {
        Self {
            configured_path: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Prefer an explicit ffprobe binary over `PATH` lookup.
    pub fn with_path(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.configured_path = path.map(Into::into);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataProbe for FfprobeProbe {
    async fn probe(&self, data: &[u8]) -> Result<VideoMetadata> {
        let program = get_tool_path(TOOL, self.configured_path.as_deref())?;

        // ffprobe needs a seekable source for containers with a trailing index.
        let staged = tempfile::Builder::new()
            .prefix("gifforge-probe-")
            .tempfile()?;
        tokio::fs::write(staged.path(), data).await?;

        let output = ToolCommand::new(program)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(staged.path().to_string_lossy())
            .timeout(self.timeout)
            .execute()
            .await?;

        let metadata = parse_ffprobe_json(&output.stdout)?;
        debug!(
            duration_secs = metadata.duration_secs,
            dimensions = %metadata.dimensions,
            "Probed video metadata"
        );
        Ok(metadata)
    }
}

/// Extract duration and dimensions from ffprobe's JSON report.
pub fn parse_ffprobe_json(json: &str) -> Result<VideoMetadata> {
    let output: FfprobeOutput = serde_json::from_str(json)?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| Error::parse_error(TOOL, "no video stream"))?;

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(Error::parse_error(TOOL, "video stream has no dimensions")),
    };

    let duration_secs = output
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| Error::parse_error(TOOL, "duration unavailable"))?;

    Ok(VideoMetadata {
        duration_secs,
        dimensions: Dimensions { width, height },
    })
}
