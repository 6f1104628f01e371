//! Input checks for candidate videos and conversion settings.

use gifforge_common::constants::{ALLOWED_VIDEO_FORMATS, MAX_FILE_SIZE};
use gifforge_common::paths::format_file_size;
use gifforge_common::{ConversionSettings, Error};
use serde::Serialize;

/// Outcome of checking a candidate video against the size limit and the
/// accepted media types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoValidation {
    pub is_valid: bool,
    /// Size problems first, then format problems.
    pub errors: Vec<String>,
    pub max_size: u64,
    pub allowed_formats: &'static [&'static str],
}

impl VideoValidation {
    /// All messages joined into one line.
    pub fn message(&self) -> String {
        self.errors.join(", ")
    }

    pub fn into_result(self) -> gifforge_common::Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(Error::validation(self.errors))
        }
    }
}

/// Check a video's byte size and declared media type.
///
/// Media type parameters (`video/mp4; codecs=...`) and letter case are
/// ignored when matching.
pub fn validate_video(size: u64, media_type: &str) -> VideoValidation {
    let mut errors = Vec::new();

    if size > MAX_FILE_SIZE {
        errors.push(format!(
            "File exceeds the maximum size of {}.",
            format_file_size(MAX_FILE_SIZE)
        ));
    }

    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !ALLOWED_VIDEO_FORMATS.iter().any(|f| *f == essence) {
        let shown = if media_type.trim().is_empty() {
            "unknown"
        } else {
            media_type.trim()
        };
        errors.push(format!("Unsupported format: {shown}."));
    }

    VideoValidation {
        is_valid: errors.is_empty(),
        errors,
        max_size: MAX_FILE_SIZE,
        allowed_formats: ALLOWED_VIDEO_FORMATS,
    }
}

/// Reject settings the filter translation cannot express sensibly.
pub fn check_settings(settings: &ConversionSettings) -> gifforge_common::Result<()> {
    if !settings.speed.is_finite() || settings.speed <= 0.0 {
        return Err(Error::invalid_input(format!(
            "Speed must be positive, got {}",
            settings.speed
        )));
    }
    for (label, value) in [("Start", settings.start_time), ("End", settings.end_time)] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::invalid_input(format!(
                    "{label} time must be a non-negative number, got {v}"
                )));
            }
        }
    }
    if let (Some(start), Some(end)) = (settings.start_time, settings.end_time) {
        if end <= start {
            return Err(Error::invalid_input(format!(
                "End time ({end}) must be after start time ({start})"
            )));
        }
    }
    Ok(())
}
