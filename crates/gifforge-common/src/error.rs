//! Common error types used throughout gifforge.
//!
//! Every failure the conversion layer can observe is folded into [`Error`].
//! Validation and probe failures are recoverable by picking another file;
//! engine failures are recoverable by retrying the conversion.

/// Common error type for gifforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The selected video violates the input limits.
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    /// The transcoding engine could not be loaded.
    #[error("Engine failed to initialize: {0}")]
    EngineInit(String),

    /// The transcoding engine failed while running a job.
    #[error("Engine failed to convert: {0}")]
    EngineExec(String),

    /// Video metadata could not be read.
    #[error("Metadata unavailable: {0}")]
    MetadataProbe(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a new Validation error from the violation messages.
    pub fn validation<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation(messages.into_iter().map(Into::into).collect())
    }

    /// Create a new EngineInit error.
    pub fn engine_init<S: Into<String>>(msg: S) -> Self {
        Self::EngineInit(msg.into())
    }

    /// Create a new EngineExec error.
    pub fn engine_exec<S: Into<String>>(msg: S) -> Self {
        Self::EngineExec(msg.into())
    }

    /// Create a new MetadataProbe error.
    pub fn metadata_probe<S: Into<String>>(msg: S) -> Self {
        Self::MetadataProbe(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether retrying the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EngineInit(_) | Self::EngineExec(_) | Self::Io(_))
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::validation(["too big", "wrong type"]);
        assert_eq!(err.to_string(), "too big, wrong type");

        let err = Error::engine_init("wasm missing");
        assert_eq!(err.to_string(), "Engine failed to initialize: wasm missing");

        let err = Error::engine_exec("exit code 1");
        assert_eq!(err.to_string(), "Engine failed to convert: exit code 1");

        let err = Error::metadata_probe("no streams");
        assert_eq!(err.to_string(), "Metadata unavailable: no streams");

        let err = Error::invalid_input("bad speed");
        assert_eq!(err.to_string(), "Invalid input: bad speed");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_retryable() {
        assert!(Error::engine_init("x").is_retryable());
        assert!(Error::engine_exec("x").is_retryable());
        assert!(!Error::validation(["x"]).is_retryable());
        assert!(!Error::metadata_probe("x").is_retryable());
    }
}
