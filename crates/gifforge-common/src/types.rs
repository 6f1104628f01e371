//! Core type definitions for conversion settings and video metadata.
//!
//! All enums are serialized in lowercase so the same spelling is used on the
//! command line, in the configuration file, and in emitted events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    QualityPreset, QUALITY_HIGH, QUALITY_LOW, QUALITY_MEDIUM, SIZE_LARGE, SIZE_MEDIUM, SIZE_SMALL,
};

/// Visual quality tier of the produced GIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// 8 fps.
    Low,
    /// 10 fps.
    #[default]
    Medium,
    /// 15 fps.
    High,
}

impl Quality {
    /// The fixed frame rate and scale pair for this tier.
    pub fn preset(self) -> QualityPreset {
        match self {
            Self::Low => QUALITY_LOW,
            Self::Medium => QUALITY_MEDIUM,
            Self::High => QUALITY_HIGH,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!(
                "unknown quality '{other}' (expected low, medium or high)"
            )),
        }
    }
}

/// Output size tier of the produced GIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeTier {
    /// 240 pixels wide.
    Small,
    /// 320 pixels wide.
    #[default]
    Medium,
    /// 480 pixels wide.
    Large,
}

impl SizeTier {
    /// The ffmpeg scale expression for this tier.
    pub fn scale(self) -> &'static str {
        match self {
            Self::Small => SIZE_SMALL,
            Self::Medium => SIZE_MEDIUM,
            Self::Large => SIZE_LARGE,
        }
    }
}

impl fmt::Display for SizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
        }
    }
}

impl FromStr for SizeTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            other => Err(format!(
                "unknown size '{other}' (expected small, medium or large)"
            )),
        }
    }
}

/// User-chosen conversion settings.
///
/// Always fully defined; callers change it through [`SettingsUpdate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    /// Playback speed factor. `2.0` halves the duration.
    pub speed: f64,
    pub quality: Quality,
    pub size: SizeTier,
    /// Trim start, in seconds.
    pub start_time: Option<f64>,
    /// Trim end, in seconds.
    pub end_time: Option<f64>,
    /// `None` loops forever.
    #[serde(rename = "loop")]
    pub loop_forever: Option<bool>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            quality: Quality::Medium,
            size: SizeTier::Medium,
            start_time: None,
            end_time: None,
            loop_forever: None,
        }
    }
}

impl ConversionSettings {
    /// Merge a partial update field by field.
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(speed) = update.speed {
            self.speed = speed;
        }
        if let Some(quality) = update.quality {
            self.quality = quality;
        }
        if let Some(size) = update.size {
            self.size = size;
        }
        if let Some(start) = update.start_time {
            self.start_time = start;
        }
        if let Some(end) = update.end_time {
            self.end_time = end;
        }
        if let Some(looping) = update.loop_forever {
            self.loop_forever = looping;
        }
    }

    /// Whether the GIF should repeat indefinitely.
    pub fn loops_forever(&self) -> bool {
        self.loop_forever.unwrap_or(true)
    }
}

/// Partial update to [`ConversionSettings`].
///
/// `None` leaves a field untouched. The trim and loop fields are doubly
/// optional so an update can also clear them (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub speed: Option<f64>,
    pub quality: Option<Quality>,
    pub size: Option<SizeTier>,
    pub start_time: Option<Option<f64>>,
    pub end_time: Option<Option<f64>>,
    pub loop_forever: Option<Option<bool>>,
}

/// Pixel dimensions of a video or image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Metadata returned by a video probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub duration_secs: f64,
    pub dimensions: Dimensions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_presets() {
        assert_eq!(Quality::Low.preset().fps, 8);
        assert_eq!(Quality::Medium.preset().fps, 10);
        assert_eq!(Quality::High.preset().fps, 15);
        assert_eq!(Quality::High.preset().scale, "480:-1");
    }

    #[test]
    fn test_size_scales() {
        assert_eq!(SizeTier::Small.scale(), "240:-1");
        assert_eq!(SizeTier::Medium.scale(), "320:-1");
        assert_eq!(SizeTier::Large.scale(), "480:-1");
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("HIGH".parse::<Quality>().unwrap(), Quality::High);
        assert_eq!("small".parse::<SizeTier>().unwrap(), SizeTier::Small);
        assert!("ultra".parse::<Quality>().is_err());
        assert!("huge".parse::<SizeTier>().is_err());
    }

    #[test]
    fn test_tier_display_roundtrip() {
        for q in [Quality::Low, Quality::Medium, Quality::High] {
            assert_eq!(q.to_string().parse::<Quality>().unwrap(), q);
        }
        for s in [SizeTier::Small, SizeTier::Medium, SizeTier::Large] {
            assert_eq!(s.to_string().parse::<SizeTier>().unwrap(), s);
        }
    }

    #[test]
    fn test_settings_defaults() {
        let settings = ConversionSettings::default();
        assert_eq!(settings.speed, 1.0);
        assert_eq!(settings.quality, Quality::Medium);
        assert_eq!(settings.size, SizeTier::Medium);
        assert!(settings.start_time.is_none());
        assert!(settings.end_time.is_none());
        assert!(settings.loops_forever());
    }

    #[test]
    fn test_apply_partial_update() {
        let mut settings = ConversionSettings::default();
        settings.apply(SettingsUpdate {
            speed: Some(2.0),
            start_time: Some(Some(1.5)),
            ..Default::default()
        });
        assert_eq!(settings.speed, 2.0);
        assert_eq!(settings.start_time, Some(1.5));
        assert_eq!(settings.quality, Quality::Medium);

        settings.apply(SettingsUpdate {
            start_time: Some(None),
            loop_forever: Some(Some(false)),
            ..Default::default()
        });
        assert!(settings.start_time.is_none());
        assert!(!settings.loops_forever());
        assert_eq!(settings.speed, 2.0);
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: ConversionSettings =
            serde_json::from_str(r#"{"quality":"high","loop":false}"#).unwrap();
        assert_eq!(settings.quality, Quality::High);
        assert_eq!(settings.size, SizeTier::Medium);
        assert_eq!(settings.speed, 1.0);
        assert_eq!(settings.loop_forever, Some(false));
    }
}
