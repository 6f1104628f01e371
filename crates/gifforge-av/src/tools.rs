//! Locating ffmpeg and ffprobe.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// What a tool is needed for.
pub const FFMPEG_PURPOSE: &str = "conversion";
pub const FFPROBE_PURPOSE: &str = "metadata";

/// Availability report for one external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub purpose: &'static str,
    pub available: bool,
    /// First line of the `-version` banner.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Resolve `name` (or its configured location) and read its version banner.
///
/// ```no_run
/// use gifforge_av::check_tool;
///
/// let info = check_tool("ffprobe", None);
/// if info.available {
///     println!("ffprobe version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str, configured: Option<&Path>) -> ToolInfo {
    let purpose = match name {
        "ffmpeg" => FFMPEG_PURPOSE,
        "ffprobe" => FFPROBE_PURPOSE,
        _ => "",
    };
    let missing = ToolInfo {
        name: name.to_string(),
        purpose,
        available: false,
        version: None,
        path: None,
    };

    let Ok(path) = get_tool_path(name, configured) else {
        return missing;
    };

    // ffmpeg-family tools only understand the single-dash form.
    match Command::new(&path).arg("-version").output() {
        Ok(output) if output.status.success() => ToolInfo {
            version: String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(str::to_string),
            path: Some(path),
            available: true,
            ..missing
        },
        _ => ToolInfo {
            path: Some(path),
            ..missing
        },
    }
}

/// Report on ffmpeg and ffprobe, honouring configured locations.
pub fn check_tools(ffmpeg: Option<&Path>, ffprobe: Option<&Path>) -> Vec<ToolInfo> {
    vec![check_tool("ffmpeg", ffmpeg), check_tool("ffprobe", ffprobe)]
}

/// Find `name` on `PATH`.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Prefer a configured path that exists, otherwise search `PATH`.
pub fn get_tool_path(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(
            tool = name,
            path = %path.display(),
            "Configured tool path does not exist, searching PATH"
        );
    }

    require_tool(name)
}
