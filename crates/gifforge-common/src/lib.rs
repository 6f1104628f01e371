//! Gifforge-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across gifforge:
//!
//! - **Conversion Types**: quality and size tiers, conversion settings and
//!   partial updates, pixel dimensions and probed video metadata
//! - **Constants**: the fixed input limits and per-tier encoding presets
//! - **Path Utilities**: media type inference, output naming, size formatting
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use gifforge_common::{ConversionSettings, Quality, SizeTier, SettingsUpdate};
//! use gifforge_common::paths::gif_file_name;
//!
//! let mut settings = ConversionSettings::default();
//! settings.apply(SettingsUpdate {
//!     quality: Some(Quality::High),
//!     ..Default::default()
//! });
//! assert_eq!(settings.quality, Quality::High);
//! assert_eq!(settings.size, SizeTier::Medium);
//!
//! assert_eq!(gif_file_name("holiday.mp4"), "holiday.gif");
//! ```

pub mod constants;
pub mod error;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
