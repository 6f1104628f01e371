//! Translation of conversion settings into an ffmpeg filter graph and
//! argument list.
//!
//! The translation is total: values that make no sense (zero speed, an end
//! before the start) are rejected at the input boundary, not here.

use std::fmt;

use gifforge_common::ConversionSettings;

/// Engine namespace entry the input video is staged under.
pub const INPUT_FILE: &str = "input.mp4";

/// Engine namespace entry the GIF is written to.
pub const OUTPUT_FILE: &str = "output.gif";

/// Frame-rate, scale, and playback-rate terms derived from settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub fps: u32,
    pub scale: &'static str,
    /// Presentation timestamp multiplier (`1 / speed`); `None` at normal speed.
    pub pts_factor: Option<f64>,
}

impl FilterSpec {
    pub fn from_settings(settings: &ConversionSettings) -> Self {
        let pts_factor = if (settings.speed - 1.0).abs() > f64::EPSILON {
            Some(1.0 / settings.speed)
        } else {
            None
        };

        Self {
            fps: settings.quality.preset().fps,
            scale: settings.size.scale(),
            pts_factor,
        }
    }

    /// Render the `-vf` expression: `fps`, then `scale`, then `setpts`.
    pub fn expression(&self) -> String {
        let mut expr = format!("fps={},scale={}", self.fps, self.scale);
        if let Some(factor) = self.pts_factor {
            expr.push_str(&format!(",setpts={factor}*PTS"));
        }
        expr
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression())
    }
}

/// A complete engine invocation for one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeArgs {
    pub filter: FilterSpec,
    pub loop_forever: bool,
    pub args: Vec<String>,
}

/// Build the argument list for converting [`INPUT_FILE`] into [`OUTPUT_FILE`].
pub fn build_args(settings: &ConversionSettings) -> TranscodeArgs {
    build_args_for(settings, INPUT_FILE, OUTPUT_FILE)
}

/// Build the argument list for arbitrary input/output entry names.
///
/// Layout: optional `-ss`/`-to` trim, input, `-vf` filter, `-loop` flag,
/// output. The trim bounds are input options so they cut the source timeline
/// before `setpts` changes the playback rate.
pub fn build_args_for(settings: &ConversionSettings, input: &str, output: &str) -> TranscodeArgs {
    let filter = FilterSpec::from_settings(settings);
    let loop_forever = settings.loops_forever();

    let mut args = Vec::new();
    if let Some(start) = settings.start_time {
        args.push("-ss".to_string());
        args.push(format!("{start}"));
    }
    if let Some(end) = settings.end_time {
        args.push("-to".to_string());
        args.push(format!("{end}"));
    }
    args.push("-i".to_string());
    args.push(input.to_string());
    args.push("-vf".to_string());
    args.push(filter.expression());
    args.push("-loop".to_string());
    // GIF loop extension: 0 repeats forever, -1 plays once.
    args.push(if loop_forever { "0" } else { "-1" }.to_string());
    args.push(output.to_string());

    TranscodeArgs {
        filter,
        loop_forever,
        args,
    }
}
