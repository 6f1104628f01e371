//! Exporting finished GIFs: still-frame PNG copies and file downloads.

mod sinks;

pub use sinks::{DirectoryDownloads, FileClipboard, MemoryClipboard, NoClipboard};

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use gifforge_common::Dimensions;
use image::{DynamicImage, ImageFormat, RgbaImage};
use thiserror::Error;
use tracing::{debug, warn};

/// PNG media type written to clipboard sinks.
pub const PNG_MEDIA_TYPE: &str = "image/png";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No GIF is available to export")]
    NoArtifact,

    #[error("Clipboard image writing is not supported here")]
    ClipboardUnavailable,

    #[error("Failed to decode GIF: {0}")]
    Decode(String),

    #[error("Failed to encode PNG: {0}")]
    Encode(String),

    #[error("PNG encoding produced no data")]
    EmptyEncoding,

    #[error("Export destination failed: {0}")]
    Sink(String),

    #[error("Export task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An encoded still image handed to a clipboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardImage {
    pub media_type: &'static str,
    pub data: Vec<u8>,
    pub dimensions: Dimensions,
}

/// Destination for copied still frames.
#[async_trait]
pub trait ClipboardSink: Send + Sync {
    /// Whether images can be written at all.
    fn is_available(&self) -> bool;

    async fn write_image(&self, image: ClipboardImage) -> Result<(), ExportError>;
}

/// Destination for downloaded files.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Persist the staged file under `file_name`, returning where it landed.
    async fn save(&self, staged: &Path, file_name: &str) -> Result<PathBuf, ExportError>;
}

/// Render the first frame of a GIF onto a canvas of the same size, encode it
/// as PNG, and hand it to `sink`.
pub async fn copy_as_still_image(
    gif: Bytes,
    sink: &dyn ClipboardSink,
) -> Result<Dimensions, ExportError> {
    if !sink.is_available() {
        return Err(ExportError::ClipboardUnavailable);
    }

    let (png, dimensions) = tokio::task::spawn_blocking(move || render_first_frame(&gif))
        .await
        .map_err(|e| ExportError::Task(e.to_string()))??;

    debug!(dimensions = %dimensions, bytes = png.len(), "Encoded still frame");
    sink.write_image(ClipboardImage {
        media_type: PNG_MEDIA_TYPE,
        data: png,
        dimensions,
    })
    .await?;
    Ok(dimensions)
}

/// Decode the first frame and re-encode it as PNG.
pub fn render_first_frame(gif: &[u8]) -> Result<(Vec<u8>, Dimensions), ExportError> {
    let frame = image::load_from_memory_with_format(gif, ImageFormat::Gif)
        .map_err(|e| ExportError::Decode(e.to_string()))?;
    let dimensions = Dimensions {
        width: frame.width(),
        height: frame.height(),
    };

    let mut canvas = RgbaImage::new(dimensions.width, dimensions.height);
    image::imageops::overlay(&mut canvas, &frame.to_rgba8(), 0, 0);

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    if png.is_empty() {
        return Err(ExportError::EmptyEncoding);
    }

    Ok((png, dimensions))
}

/// Stage `data` in a temporary file, hand it to `sink` as `file_name`, and
/// release the staged copy.
pub async fn trigger_download(
    data: &[u8],
    file_name: &str,
    sink: &dyn DownloadSink,
) -> Result<PathBuf, ExportError> {
    let staged = tempfile::Builder::new()
        .prefix("gifforge-download-")
        .suffix(".gif")
        .tempfile()?;
    tokio::fs::write(staged.path(), data).await?;

    let saved = sink.save(staged.path(), file_name).await;

    match tokio::task::spawn_blocking(move || staged.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Failed to release staged download"),
        Err(e) => warn!(error = %e, "Release task for staged download failed"),
    }

    saved
}
