//! Scratch namespace for engine inputs and outputs.

use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

/// Temporary directory that holds the files an engine job reads and writes.
///
/// Entries are addressed by bare file names; anything that would escape the
/// directory is rejected.
///
/// # Example
///
/// ```no_run
/// use gifforge_av::Workspace;
///
/// # async fn example() -> gifforge_av::Result<()> {
/// let workspace = Workspace::new()?;
/// workspace.write("input.mp4", b"...").await?;
/// let bytes = workspace.read("input.mp4").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a new, empty workspace.
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("gifforge-")
            .tempdir()
            .map_err(|e| Error::Workspace(e.to_string()))?;
        Ok(Self { temp_dir })
    }

    /// Get the workspace directory path.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Resolve an entry name to its path inside the workspace.
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        let candidate = Path::new(name);
        let mut components = candidate.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.temp_dir.path().join(candidate)),
            _ => Err(Error::InvalidInput(format!(
                "workspace entry must be a plain file name: {name:?}"
            ))),
        }
    }

    /// Stage bytes under `name`, replacing any previous entry.
    pub async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.path(name)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    /// Read the entry stored under `name`.
    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::file_not_found(path)),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the entry stored under `name` if present.
    pub async fn remove(&self, name: &str) -> Result<()> {
        let path = self.path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Clean up the workspace and everything staged in it.
    pub fn cleanup(self) {
        // TempDir will clean up on drop
        drop(self.temp_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_paths() {
        let workspace = Workspace::new().unwrap();
        let path = workspace.path("output.gif").unwrap();
        assert!(path.starts_with(workspace.dir()));
        assert_eq!(path.file_name().unwrap(), "output.gif");
    }

    #[test]
    fn test_rejects_escaping_names() {
        let workspace = Workspace::new().unwrap();
        assert!(workspace.path("../etc/passwd").is_err());
        assert!(workspace.path("/abs/path").is_err());
        assert!(workspace.path("nested/file").is_err());
        assert!(workspace.path("").is_err());
    }

    #[tokio::test]
    async fn test_write_read_remove() {
        let workspace = Workspace::new().unwrap();
        workspace.write("input.mp4", b"video").await.unwrap();
        assert_eq!(workspace.read("input.mp4").await.unwrap(), b"video");

        workspace.remove("input.mp4").await.unwrap();
        let err = workspace.read("input.mp4").await.unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));

        // Removing twice is fine.
        workspace.remove("input.mp4").await.unwrap();
    }

    #[test]
    fn test_cleanup_removes_dir() {
        let workspace = Workspace::new().unwrap();
        let dir = workspace.dir().to_path_buf();
        assert!(dir.exists());
        workspace.cleanup();
        assert!(!dir.exists());
    }
}
