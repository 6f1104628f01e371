//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a [`ConversionOrchestrator`] to a
//! scripted [`FakeGateway`], a [`FakeProbe`], an in-memory clipboard, and a
//! temporary download directory.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use gifforge::conversion::{
    ConversionGateway, ConversionOrchestrator, ConversionState, ConverterEvent, PercentFn,
    VideoDescriptor,
};
use gifforge::export::{DirectoryDownloads, MemoryClipboard};
use gifforge_av::{MetadataProbe, TranscodeArgs};
use gifforge_common::{Dimensions, Error, Result, VideoMetadata};
use image::codecs::gif::GifEncoder;
use image::{Delay, Frame, Rgba, RgbaImage};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::{broadcast, Notify};

/// Scripted [`ConversionGateway`].
pub struct FakeGateway {
    pub init_calls: AtomicUsize,
    pub convert_calls: AtomicUsize,
    pub last_args: Mutex<Option<Vec<String>>>,
    /// Signalled once a conversion has reported its progress.
    pub started: Notify,
    /// When set, conversions wait for a permit before returning.
    pub gate: Option<Notify>,
    progress: Vec<u8>,
    init_error: Option<String>,
    result: std::result::Result<Vec<u8>, String>,
}

impl FakeGateway {
    pub fn succeeding(output: Vec<u8>) -> Self {
        Self {
            init_calls: AtomicUsize::new(0),
            convert_calls: AtomicUsize::new(0),
            last_args: Mutex::new(None),
            started: Notify::new(),
            gate: None,
            progress: vec![0, 25, 50, 75, 100],
            init_error: None,
            result: Ok(output),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            ..Self::succeeding(Vec::new())
        }
    }

    pub fn failing_init(message: &str) -> Self {
        Self {
            init_error: Some(message.to_string()),
            ..Self::succeeding(sample_gif(8, 8))
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn with_progress(mut self, progress: Vec<u8>) -> Self {
        self.progress = progress;
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn convert_count(&self) -> usize {
        self.convert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversionGateway for FakeGateway {
    async fn initialize(&self) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        match &self.init_error {
            Some(message) => Err(Error::engine_init(message.clone())),
            None => Ok(()),
        }
    }

    async fn convert(
        &self,
        _input: &[u8],
        job: &TranscodeArgs,
        on_progress: PercentFn<'_>,
    ) -> Result<Vec<u8>> {
        self.convert_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_args.lock() = Some(job.args.clone());

        for percent in &self.progress {
            on_progress(*percent);
        }
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.result.clone().map_err(Error::engine_exec)
    }
}

/// [`MetadataProbe`] returning a fixed answer.
pub struct FakeProbe {
    metadata: Option<VideoMetadata>,
    /// Signalled each time a probe starts.
    pub entered: Notify,
    /// When set, each probe waits for a permit before answering.
    pub gate: Option<Notify>,
}

impl FakeProbe {
    pub fn returning(width: u32, height: u32, duration_secs: f64) -> Self {
        Self {
            metadata: Some(VideoMetadata {
                duration_secs,
                dimensions: Dimensions { width, height },
            }),
            entered: Notify::new(),
            gate: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            metadata: None,
            ..Self::returning(0, 0, 0.0)
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl MetadataProbe for FakeProbe {
    async fn probe(&self, _data: &[u8]) -> gifforge_av::Result<VideoMetadata> {
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.metadata
            .ok_or_else(|| gifforge_av::Error::parse_error("ffprobe", "no video stream"))
    }
}

/// An orchestrator wired to fakes, with handles to inspect them.
pub struct TestHarness {
    pub orchestrator: Arc<ConversionOrchestrator>,
    pub gateway: Arc<FakeGateway>,
    pub probe: Arc<FakeProbe>,
    pub clipboard: Arc<MemoryClipboard>,
    pub downloads: TempDir,
    pub events: broadcast::Receiver<ConverterEvent>,
}

impl TestHarness {
    pub fn new(gateway: FakeGateway) -> Self {
        Self::with_probe(gateway, FakeProbe::returning(640, 360, 4.0))
    }

    pub fn with_probe(gateway: FakeGateway, probe: FakeProbe) -> Self {
        let gateway = Arc::new(gateway);
        let probe = Arc::new(probe);
        let clipboard = Arc::new(MemoryClipboard::new());
        let downloads = tempfile::tempdir().expect("failed to create download dir");

        let orchestrator = ConversionOrchestrator::new(gateway.clone(), probe.clone())
            .with_clipboard(clipboard.clone())
            .with_downloads(Arc::new(DirectoryDownloads::new(downloads.path())));
        let events = orchestrator.subscribe();

        Self {
            orchestrator: Arc::new(orchestrator),
            gateway,
            probe,
            clipboard,
            downloads,
            events,
        }
    }

    /// Every state published since the last call, in order.
    pub fn states(&mut self) -> Vec<ConversionState> {
        let mut states = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let ConverterEvent::StateChanged { state } = event {
                states.push(state);
            }
        }
        states
    }
}

pub fn mp4(name: &str) -> VideoDescriptor {
    VideoDescriptor::new(name, "video/mp4", vec![0u8; 2048])
}

/// A small two-frame animated GIF: red, then blue.
pub fn sample_gif(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        for color in [[255, 0, 0, 255], [0, 0, 255, 255]] {
            let buffer = RgbaImage::from_pixel(width, height, Rgba(color));
            encoder
                .encode_frame(Frame::from_parts(
                    buffer,
                    0,
                    0,
                    Delay::from_numer_denom_ms(100, 1),
                ))
                .expect("failed to encode frame");
        }
    }
    out
}
