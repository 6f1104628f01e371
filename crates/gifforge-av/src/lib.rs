//! # gifforge-av
//!
//! Media tooling for gifforge.
//!
//! This crate provides:
//! - The [`TranscodeEngine`] contract and its ffmpeg CLI implementation
//! - The [`MetadataProbe`] contract and its ffprobe implementation
//! - Translation of [`ConversionSettings`](gifforge_common::ConversionSettings)
//!   into a filter graph and engine argument list
//! - External tool detection and a timeout-aware command runner
//!
//! ## Example
//!
//! ```
//! use gifforge_av::filter::build_args;
//! use gifforge_common::ConversionSettings;
//!
//! let job = build_args(&ConversionSettings::default());
//! assert_eq!(job.filter.expression(), "fps=10,scale=320:-1");
//! ```

mod command;
mod error;
pub mod engine;
pub mod ffmpeg;
pub mod filter;
pub mod probe;
pub mod tools;
pub mod workspace;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use engine::{ProgressFn, TranscodeEngine};
pub use error::{Error, Result};
pub use ffmpeg::FfmpegEngine;
pub use filter::{build_args, FilterSpec, TranscodeArgs};
pub use probe::{FfprobeProbe, MetadataProbe};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
pub use workspace::Workspace;
