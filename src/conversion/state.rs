use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use gifforge_common::constants::MAX_FILE_SIZE;
use gifforge_common::paths::{gif_file_name, media_type_for_path};
use gifforge_common::{ConversionSettings, Dimensions, VideoMetadata};
use serde::{Deserialize, Serialize};

pub const FEEDBACK_LOADED: &str = "Video loaded!";
pub const FEEDBACK_INITIALIZING: &str = "Initializing conversion...";
pub const FEEDBACK_COMPLETE: &str = "Conversion complete!";
pub const FEEDBACK_FAILED: &str = "Conversion failed.";
pub const FEEDBACK_FRAME_COPIED: &str = "Frame copied as PNG!";

/// Fallback message when a failure carries no text.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Idle,
    Initializing,
    Processing,
    Finalizing,
    Completed,
    Error,
}

impl Stage {
    /// A conversion attempt is in flight.
    pub fn is_active(self) -> bool {
        matches!(self, Stage::Initializing | Stage::Processing | Stage::Finalizing)
    }
}

/// Observable status of the current conversion attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionState {
    pub stage: Stage,
    /// Percent complete, 0 to 100.
    pub progress: u8,
    pub feedback: String,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for ConversionState {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            progress: 0,
            feedback: String::new(),
            error: None,
            started_at: None,
            completed_at: None,
        }
    }
}

impl ConversionState {
    pub fn loaded() -> Self {
        Self {
            feedback: FEEDBACK_LOADED.to_string(),
            ..Default::default()
        }
    }

    pub fn start(&mut self) {
        self.stage = Stage::Initializing;
        self.progress = 0;
        self.feedback = FEEDBACK_INITIALIZING.to_string();
        self.error = None;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
    }

    pub fn begin_processing(&mut self) {
        self.stage = Stage::Processing;
        self.update_progress(0);
    }

    /// Record engine progress. Never moves backwards and holds below 100
    /// until the result is in.
    pub fn update_progress(&mut self, percent: u8) {
        self.progress = self.progress.max(percent.min(99));
        self.feedback = format!("Converting... {}%", self.progress);
    }

    pub fn finalize(&mut self) {
        self.stage = Stage::Finalizing;
    }

    pub fn complete(&mut self) {
        self.stage = Stage::Completed;
        self.progress = 100;
        self.feedback = FEEDBACK_COMPLETE.to_string();
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: &str) {
        self.stage = Stage::Error;
        self.progress = 0;
        self.feedback = FEEDBACK_FAILED.to_string();
        self.error = Some(if error.is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            error.to_string()
        });
        self.completed_at = Some(Utc::now());
    }

    /// Error stage for a rejected input, where the message doubles as feedback.
    pub fn rejected(message: &str) -> Self {
        let mut state = Self::default();
        state.fail(message);
        state.feedback = state.error.clone().unwrap_or_default();
        state
    }
}

/// A video chosen for conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDescriptor {
    pub name: String,
    pub media_type: String,
    /// Declared size in bytes. Equal to `bytes.len()` unless the content was
    /// left unread because it is over the size limit.
    pub size: u64,
    pub bytes: Bytes,
    pub metadata: Option<VideoMetadata>,
}

impl VideoDescriptor {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size: bytes.len() as u64,
            bytes,
            metadata: None,
        }
    }

    /// Read a video from disk, inferring its media type from the extension
    /// unless one is given.
    ///
    /// Files over the size limit are not read; the descriptor carries only
    /// the declared size so validation can reject it.
    pub async fn from_file(path: &Path, media_type: Option<&str>) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let media_type = media_type
            .map(str::to_string)
            .unwrap_or_else(|| media_type_for_path(path).to_string());

        let size = tokio::fs::metadata(path).await?.len();
        if size > MAX_FILE_SIZE {
            return Ok(Self {
                name,
                media_type,
                size,
                bytes: Bytes::new(),
                metadata: None,
            });
        }

        let data = tokio::fs::read(path).await?;
        Ok(Self::new(name, media_type, data))
    }

    pub fn with_metadata(mut self, metadata: VideoMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A finished GIF held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArtifact {
    pub bytes: Bytes,
    /// Suggested name for the downloaded file.
    pub file_name: String,
    pub size: u64,
    pub dimensions: Option<Dimensions>,
    pub media_type: &'static str,
}

impl OutputArtifact {
    /// Wrap engine output, naming it after the source video.
    pub fn from_gif(data: Vec<u8>, source_name: &str) -> Self {
        let bytes = Bytes::from(data);
        Self {
            dimensions: read_dimensions(&bytes),
            size: bytes.len() as u64,
            file_name: gif_file_name(source_name),
            media_type: "image/gif",
            bytes,
        }
    }
}

fn read_dimensions(data: &[u8]) -> Option<Dimensions> {
    let (width, height) = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    Some(Dimensions { width, height })
}

/// Events published as the orchestrator changes state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ConverterEvent {
    VideoSelected {
        name: String,
        media_type: String,
        size: u64,
        metadata: Option<VideoMetadata>,
    },
    VideoCleared,
    SettingsChanged {
        settings: ConversionSettings,
    },
    StateChanged {
        state: ConversionState,
    },
    ArtifactReady {
        file_name: String,
        size: u64,
        dimensions: Option<Dimensions>,
    },
}
