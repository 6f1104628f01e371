//! Gifforge - video to animated GIF conversion
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod conversion;
pub mod export;
pub mod validation;
