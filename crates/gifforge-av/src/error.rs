//! Errors raised while driving ffmpeg and ffprobe.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither the configured path nor `PATH` yields the program.
    #[error("{tool} is not installed or not on PATH")]
    ToolNotFound { tool: String },

    /// The program ran and reported failure.
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("{tool} did not finish within {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// The program's report did not have the expected shape.
    #[error("unexpected {tool} output: {message}")]
    ParseError { tool: String, message: String },

    /// A named engine entry does not exist.
    #[error("no such entry: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An engine operation ran before `load` succeeded.
    #[error("engine used before it was loaded")]
    NotLoaded,

    #[error("could not create scratch directory: {0}")]
    Workspace(String),
}

impl Error {
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn parse_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Whether a later attempt could succeed without user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}
