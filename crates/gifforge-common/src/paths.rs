//! Path and naming utilities.
//!
//! This module infers declared media types from file extensions, derives the
//! output GIF name from the input name, and formats byte counts for display.

use chrono::Utc;
use std::path::Path;

/// Extension to media type table used when a file has no declared type.
const MEDIA_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mov", "video/mov"),
    ("avi", "video/avi"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("gif", "image/gif"),
];

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Infer a declared media type from a path's extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use gifforge_common::paths::media_type_for_path;
///
/// assert_eq!(media_type_for_path(Path::new("clip.MP4")), "video/mp4");
/// assert_eq!(media_type_for_path(Path::new("clip.mkv")), "video/x-matroska");
/// assert_eq!(media_type_for_path(Path::new("notes")), "application/octet-stream");
/// ```
pub fn media_type_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .and_then(|ext| {
            MEDIA_TYPES
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, media_type)| *media_type)
        })
        .unwrap_or(FALLBACK_MEDIA_TYPE)
}

/// Derive the GIF file name for an input display name.
///
/// The last extension is replaced with `.gif`; names without one get `.gif`
/// appended, and an empty name falls back to a timestamped name.
///
/// # Examples
///
/// ```
/// use gifforge_common::paths::gif_file_name;
///
/// assert_eq!(gif_file_name("party.final.webm"), "party.final.gif");
/// assert_eq!(gif_file_name("clip"), "clip.gif");
/// ```
pub fn gif_file_name(display_name: &str) -> String {
    let name = display_name.trim();
    if name.is_empty() {
        return generate_file_name("gifforge", "gif");
    }

    match name.rfind('.') {
        Some(idx) if idx > 0 && !name[idx + 1..].contains('/') => {
            format!("{}.gif", &name[..idx])
        }
        _ => format!("{name}.gif"),
    }
}

/// Generate a timestamped file name such as `gifforge-2024-05-01T10-00-00-000000Z.gif`.
pub fn generate_file_name(prefix: &str, extension: &str) -> String {
    let timestamp = Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
        .replace(|c: char| !c.is_ascii_alphanumeric(), "-");
    format!("{prefix}-{timestamp}.{extension}")
}

/// Format a byte count with binary units and at most two decimals.
///
/// # Examples
///
/// ```
/// use gifforge_common::paths::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(100 * 1024 * 1024), "100 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
