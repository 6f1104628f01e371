//! Fixed conversion limits and encoding presets.
//!
//! These values are part of the product contract and are intentionally not
//! exposed through the configuration file.

/// Largest accepted input, in bytes (100 MiB).
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Declared media types accepted as conversion input.
pub const ALLOWED_VIDEO_FORMATS: &[&str] = &["video/mp4", "video/mov", "video/avi", "video/webm"];

/// Frame rate and scale pair used by one quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPreset {
    /// Output frames per second.
    pub fps: u32,
    /// ffmpeg scale expression (`width:height`).
    pub scale: &'static str,
}

pub const QUALITY_LOW: QualityPreset = QualityPreset {
    fps: 8,
    scale: "240:-1",
};

pub const QUALITY_MEDIUM: QualityPreset = QualityPreset {
    fps: 10,
    scale: "320:-1",
};

pub const QUALITY_HIGH: QualityPreset = QualityPreset {
    fps: 15,
    scale: "480:-1",
};

pub const SIZE_SMALL: &str = "240:-1";
pub const SIZE_MEDIUM: &str = "320:-1";
pub const SIZE_LARGE: &str = "480:-1";
