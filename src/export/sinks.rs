use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use super::{ClipboardImage, ClipboardSink, DownloadSink, ExportError};

/// Clipboard for environments without image clipboard support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClipboard;

#[async_trait]
impl ClipboardSink for NoClipboard {
    fn is_available(&self) -> bool {
        false
    }

    async fn write_image(&self, _image: ClipboardImage) -> Result<(), ExportError> {
        Err(ExportError::ClipboardUnavailable)
    }
}

/// Holds the most recently copied image in memory.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    last: Mutex<Option<ClipboardImage>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<ClipboardImage> {
        self.last.lock().clone()
    }
}

#[async_trait]
impl ClipboardSink for MemoryClipboard {
    fn is_available(&self) -> bool {
        true
    }

    async fn write_image(&self, image: ClipboardImage) -> Result<(), ExportError> {
        *self.last.lock() = Some(image);
        Ok(())
    }
}

/// Writes each copied image to a fixed file path.
#[derive(Debug, Clone)]
pub struct FileClipboard {
    path: PathBuf,
}

impl FileClipboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ClipboardSink for FileClipboard {
    fn is_available(&self) -> bool {
        true
    }

    async fn write_image(&self, image: ClipboardImage) -> Result<(), ExportError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, &image.data).await?;
        info!(path = %self.path.display(), dimensions = %image.dimensions, "Wrote still frame");
        Ok(())
    }
}

/// Saves downloads into a directory, creating it on demand.
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloads {
    async fn save(&self, staged: &Path, file_name: &str) -> Result<PathBuf, ExportError> {
        // Only the final component is honoured so names cannot escape `dir`.
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| ExportError::Sink(format!("invalid file name: {file_name:?}")))?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.dir.join(name);
        tokio::fs::copy(staged, &target).await?;
        info!(path = %target.display(), "Saved GIF");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gifforge_common::Dimensions;

    fn image() -> ClipboardImage {
        ClipboardImage {
            media_type: "image/png",
            data: vec![1, 2, 3],
            dimensions: Dimensions { width: 1, height: 1 },
        }
    }

    #[tokio::test]
    async fn test_no_clipboard() {
        assert!(!NoClipboard.is_available());
        assert!(NoClipboard.write_image(image()).await.is_err());
    }

    #[tokio::test]
    async fn test_file_clipboard_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileClipboard::new(dir.path().join("frames/first.png"));
        sink.write_image(image()).await.unwrap();
        assert_eq!(tokio::fs::read(sink.path()).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_download_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("staged.gif");
        tokio::fs::write(&staged, b"gif").await.unwrap();

        let sink = DirectoryDownloads::new(dir.path().join("downloads"));
        let saved = sink.save(&staged, "../../escape.gif").await.unwrap();
        assert_eq!(saved, dir.path().join("downloads").join("escape.gif"));
        assert_eq!(tokio::fs::read(&saved).await.unwrap(), b"gif");
    }

    #[tokio::test]
    async fn test_download_rejects_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectoryDownloads::new(dir.path());
        assert!(matches!(
            sink.save(&dir.path().join("x"), "..").await,
            Err(ExportError::Sink(_))
        ));
    }
}
