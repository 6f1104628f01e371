//! Video to GIF conversion.
//!
//! This module holds the conversion workflow:
//!
//! - [`ConversionOrchestrator`]: selection, settings, staged conversion, export
//! - [`ConversionGateway`]: single-flight engine initialization and serialized jobs
//! - Observable state and the events published on every change

mod gateway;
mod orchestrator;
mod state;

pub use gateway::{ConversionGateway, EngineGateway, PercentFn};
pub use orchestrator::{ConversionOrchestrator, ConvertOutcome};
pub use state::{
    ConversionState, ConverterEvent, OutputArtifact, Stage, VideoDescriptor, FEEDBACK_COMPLETE,
    FEEDBACK_FAILED, FEEDBACK_FRAME_COPIED, FEEDBACK_INITIALIZING, FEEDBACK_LOADED, UNKNOWN_ERROR,
};
