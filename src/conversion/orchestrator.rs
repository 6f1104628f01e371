//! The conversion workflow: video selection, settings, conversion, export.
//!
//! All state lives behind one lock and every change is published on a
//! broadcast channel. Each conversion attempt is tagged with a generation
//! number; selecting or clearing a video bumps it, so results from an attempt
//! that was superseded are dropped instead of being applied.

use std::path::PathBuf;
use std::sync::Arc;

use gifforge_av::{build_args, MetadataProbe};
use gifforge_common::{ConversionSettings, Error, SettingsUpdate};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::gateway::ConversionGateway;
use super::state::{
    ConversionState, ConverterEvent, OutputArtifact, Stage, VideoDescriptor, FEEDBACK_FRAME_COPIED,
};
use crate::export::{
    self, ClipboardSink, DirectoryDownloads, DownloadSink, ExportError, NoClipboard,
};
use crate::validation::{validate_video, VideoValidation};

const EVENT_CAPACITY: usize = 256;

/// How a [`ConversionOrchestrator::convert_to_gif`] call ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConvertOutcome {
    Completed { file_name: String, size: u64 },
    Failed { error: String },
    /// No video is selected.
    NoVideo,
    /// Another conversion is in flight; this call did nothing.
    AlreadyRunning,
    /// The video was cleared or replaced before the result arrived.
    Discarded,
}

#[derive(Debug, Default)]
struct Inner {
    video: Option<VideoDescriptor>,
    settings: ConversionSettings,
    state: ConversionState,
    artifact: Option<OutputArtifact>,
    generation: u64,
}

impl Inner {
    /// Whether an attempt tagged `generation` may still write its result.
    fn accepts(&self, generation: u64) -> bool {
        self.generation == generation
            && matches!(
                self.state.stage,
                Stage::Initializing | Stage::Processing | Stage::Finalizing
            )
    }
}

pub struct ConversionOrchestrator {
    gateway: Arc<dyn ConversionGateway>,
    probe: Arc<dyn MetadataProbe>,
    clipboard: Arc<dyn ClipboardSink>,
    downloads: Arc<dyn DownloadSink>,
    inner: Mutex<Inner>,
    events: broadcast::Sender<ConverterEvent>,
}

impl ConversionOrchestrator {
    pub fn new(gateway: Arc<dyn ConversionGateway>, probe: Arc<dyn MetadataProbe>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gateway,
            probe,
            clipboard: Arc::new(NoClipboard),
            downloads: Arc::new(DirectoryDownloads::new(".")),
            inner: Mutex::new(Inner::default()),
            events,
        }
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardSink>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_downloads(mut self, downloads: Arc<dyn DownloadSink>) -> Self {
        self.downloads = downloads;
        self
    }

    /// Start from `settings` instead of the built-in defaults.
    pub fn with_settings(self, settings: ConversionSettings) -> Self {
        self.inner.lock().settings = settings;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConverterEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ConversionState {
        self.inner.lock().state.clone()
    }

    pub fn settings(&self) -> ConversionSettings {
        self.inner.lock().settings.clone()
    }

    pub fn video(&self) -> Option<VideoDescriptor> {
        self.inner.lock().video.clone()
    }

    pub fn artifact(&self) -> Option<OutputArtifact> {
        self.inner.lock().artifact.clone()
    }

    /// Validate and select a video.
    ///
    /// The previous selection is dropped up front, so an in-flight
    /// conversion is superseded while the new video is still being probed.
    /// A rejected video leaves nothing selected and puts the error stage in
    /// place with the validation messages as feedback. Metadata that cannot
    /// be read is logged and the video is selected without it.
    pub async fn select_video(&self, video: VideoDescriptor) -> VideoValidation {
        let validation = validate_video(video.size, &video.media_type);

        let generation = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.video = None;
            inner.artifact = None;
            inner.state = if validation.is_valid {
                ConversionState::default()
            } else {
                ConversionState::rejected(&validation.message())
            };
            inner.generation
        };
        self.publish_state();

        if !validation.is_valid {
            warn!(name = %video.name, errors = ?validation.errors, "Rejected video");
            return validation;
        }

        let video = match self.probe.probe(&video.bytes).await {
            Ok(metadata) => video.with_metadata(metadata),
            Err(e) => {
                let err = Error::metadata_probe(e.to_string());
                warn!(name = %video.name, error = %err, "Selecting video without metadata");
                video
            }
        };

        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                debug!(name = %video.name, "Selection superseded while probing");
                return validation;
            }
            inner.generation += 1;
            inner.artifact = None;
            inner.state = ConversionState::loaded();
            inner.video = Some(video.clone());
        }

        info!(
            name = %video.name,
            media_type = %video.media_type,
            size = video.size,
            "Video selected"
        );
        self.send(ConverterEvent::VideoSelected {
            name: video.name,
            media_type: video.media_type,
            size: video.size,
            metadata: video.metadata,
        });
        self.publish_state();
        validation
    }

    /// Drop the selected video and any result, returning to idle.
    ///
    /// An in-flight conversion keeps running but its result is discarded.
    pub fn clear_video(&self) {
        {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.video = None;
            inner.artifact = None;
            inner.state = ConversionState::default();
        }
        debug!("Video cleared");
        self.send(ConverterEvent::VideoCleared);
        self.publish_state();
    }

    /// Merge a partial update into the settings. The stage is untouched.
    pub fn update_settings(&self, update: SettingsUpdate) {
        let settings = {
            let mut inner = self.inner.lock();
            inner.settings.apply(update);
            inner.settings.clone()
        };
        debug!(?settings, "Settings updated");
        self.send(ConverterEvent::SettingsChanged { settings });
    }

    pub fn set_speed(&self, speed: f64) {
        self.update_settings(SettingsUpdate {
            speed: Some(speed),
            ..Default::default()
        });
    }

    pub fn set_quality(&self, quality: gifforge_common::Quality) {
        self.update_settings(SettingsUpdate {
            quality: Some(quality),
            ..Default::default()
        });
    }

    pub fn set_size(&self, size: gifforge_common::SizeTier) {
        self.update_settings(SettingsUpdate {
            size: Some(size),
            ..Default::default()
        });
    }

    /// Convert the selected video with the current settings.
    ///
    /// Walks initializing, processing, finalizing, completed; any failure goes
    /// straight to the error stage. Calls made while an attempt is in flight
    /// are rejected without touching state.
    pub async fn convert_to_gif(&self) -> ConvertOutcome {
        let (generation, input, settings, source_name) = {
            let mut inner = self.inner.lock();
            let Some(video) = inner.video.as_ref() else {
                return ConvertOutcome::NoVideo;
            };
            if inner.state.stage.is_active() {
                return ConvertOutcome::AlreadyRunning;
            }
            let input = video.bytes.clone();
            let source_name = video.name.clone();

            inner.generation += 1;
            inner.artifact = None;
            inner.state.start();
            (inner.generation, input, inner.settings.clone(), source_name)
        };
        self.publish_state();

        info!(name = %source_name, "Starting conversion");

        if let Err(e) = self.gateway.initialize().await {
            return self.fail(generation, &e);
        }

        if !self.transition(generation, ConversionState::begin_processing) {
            return ConvertOutcome::Discarded;
        }

        let job = build_args(&settings);
        debug!(filter = %job.filter, args = ?job.args, "Conversion job");

        let report = |percent: u8| self.report_progress(generation, percent);
        let output = match self.gateway.convert(&input, &job, &report).await {
            Ok(output) => output,
            Err(e) => return self.fail(generation, &e),
        };

        if !self.transition(generation, ConversionState::finalize) {
            return ConvertOutcome::Discarded;
        }

        let artifact = OutputArtifact::from_gif(output, &source_name);
        {
            let mut inner = self.inner.lock();
            if !inner.accepts(generation) {
                return ConvertOutcome::Discarded;
            }
            inner.state.complete();
            inner.artifact = Some(artifact.clone());
        }

        info!(
            file_name = %artifact.file_name,
            size = artifact.size,
            dimensions = ?artifact.dimensions,
            "Conversion complete"
        );
        self.send(ConverterEvent::ArtifactReady {
            file_name: artifact.file_name.clone(),
            size: artifact.size,
            dimensions: artifact.dimensions,
        });
        self.publish_state();

        ConvertOutcome::Completed {
            file_name: artifact.file_name,
            size: artifact.size,
        }
    }

    /// Copy the first frame of the finished GIF to the clipboard as PNG.
    pub async fn copy_artifact_as_image(&self) -> Result<(), ExportError> {
        let gif = self.completed_artifact()?.bytes;

        if let Err(e) = export::copy_as_still_image(gif, self.clipboard.as_ref()).await {
            warn!(error = %e, "Failed to copy still frame");
            return Err(e);
        }

        {
            let mut inner = self.inner.lock();
            if inner.state.stage == Stage::Completed {
                inner.state.feedback = FEEDBACK_FRAME_COPIED.to_string();
            }
        }
        self.publish_state();
        Ok(())
    }

    /// Save the finished GIF through the download sink.
    pub async fn download_artifact(&self) -> Result<PathBuf, ExportError> {
        let artifact = self.completed_artifact()?;
        export::trigger_download(&artifact.bytes, &artifact.file_name, self.downloads.as_ref())
            .await
    }

    fn completed_artifact(&self) -> Result<OutputArtifact, ExportError> {
        let inner = self.inner.lock();
        match (&inner.artifact, inner.state.stage) {
            (Some(artifact), Stage::Completed) => Ok(artifact.clone()),
            _ => Err(ExportError::NoArtifact),
        }
    }

    fn transition(&self, generation: u64, step: impl FnOnce(&mut ConversionState)) -> bool {
        {
            let mut inner = self.inner.lock();
            if !inner.accepts(generation) {
                debug!(generation, "Dropping stale conversion step");
                return false;
            }
            step(&mut inner.state);
        }
        self.publish_state();
        true
    }

    fn report_progress(&self, generation: u64, percent: u8) {
        let changed = {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.state.stage != Stage::Processing {
                return;
            }
            let before = inner.state.progress;
            inner.state.update_progress(percent);
            inner.state.progress != before
        };
        if changed {
            self.publish_state();
        }
    }

    fn fail(&self, generation: u64, err: &Error) -> ConvertOutcome {
        let error = {
            let mut inner = self.inner.lock();
            if !inner.accepts(generation) {
                debug!(generation, error = %err, "Dropping failure of superseded conversion");
                return ConvertOutcome::Discarded;
            }
            inner.state.fail(&err.to_string());
            inner.artifact = None;
            inner.state.error.clone().unwrap_or_default()
        };
        error!(error = %error, retryable = err.is_retryable(), "Conversion failed");
        self.publish_state();
        ConvertOutcome::Failed { error }
    }

    fn publish_state(&self) {
        let state = self.inner.lock().state.clone();
        self.send(ConverterEvent::StateChanged { state });
    }

    fn send(&self, event: ConverterEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
