//! Transcoding engine contract.

use async_trait::async_trait;

use crate::Result;

/// Progress listener invoked with the fraction of the job completed (`0.0..=1.0`).
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// An opaque media transcoder that works on named entries in its own namespace.
///
/// Implementations are not expected to be reentrant: callers must not run two
/// operations on the same instance at once.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Short human-readable engine name for logs.
    fn name(&self) -> &str;

    /// Whether `load` has completed successfully.
    fn is_loaded(&self) -> bool;

    /// Prepare the engine for use. Idempotent once successful.
    async fn load(&mut self) -> Result<()>;

    /// Stage an input under `name`.
    async fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()>;

    /// Run a job described by `args` against the staged entries.
    ///
    /// `on_progress` is called zero or more times before the future resolves.
    async fn exec(&mut self, args: &[String], on_progress: ProgressFn<'_>) -> Result<()>;

    /// Retrieve the entry stored under `name`.
    async fn read_file(&mut self, name: &str) -> Result<Vec<u8>>;

    /// Drop the entry stored under `name`.
    async fn delete_file(&mut self, name: &str) -> Result<()>;
}
