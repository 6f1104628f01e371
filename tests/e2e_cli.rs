//! CLI end-to-end tests
//!
//! Tests for the gifforge command-line interface. None of these need ffmpeg:
//! they cover argument handling, configuration, and input rejection that
//! happens before any engine work.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the gifforge binary
#[allow(deprecated)]
fn gifforge_cmd() -> Command {
    Command::cargo_bin("gifforge").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = gifforge_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = gifforge_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("gifforge"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = gifforge_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gifforge"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_convert_help_lists_settings() {
    let mut cmd = gifforge_cmd();
    cmd.args(["convert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--speed"))
        .stdout(predicate::str::contains("--quality"))
        .stdout(predicate::str::contains("--no-loop"));
}

#[test]
fn test_cli_convert_nonexistent_file() {
    let mut cmd = gifforge_cmd();
    cmd.args(["convert", "/nonexistent/path/clip.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_convert_rejects_unsupported_format() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("movie.mkv");
    fs::write(&input, b"not really a video").unwrap();

    let mut cmd = gifforge_cmd();
    cmd.current_dir(temp.path())
        .args(["convert", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported format: video/x-matroska."));
}

#[test]
fn test_cli_convert_invalid_quality() {
    let mut cmd = gifforge_cmd();
    cmd.args(["convert", "clip.mp4", "--quality", "ultra"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ultra"));
}

#[test]
fn test_cli_validate_default_config() {
    let temp = tempdir().unwrap();
    let mut cmd = gifforge_cmd();
    cmd.current_dir(temp.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"));
}

#[test]
fn test_cli_validate_config_file() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("gifforge.toml");
    fs::write(
        &config_file,
        r#"
[engine]
exec_timeout_secs = 90

[defaults]
quality = "high"
speed = 2.0
"#,
    )
    .unwrap();

    let mut cmd = gifforge_cmd();
    cmd.args(["validate", config_file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("90s"))
        .stdout(predicate::str::contains("quality high"));
}

#[test]
fn test_cli_validate_rejects_bad_defaults() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("gifforge.toml");
    fs::write(&config_file, "[defaults]\nspeed = 0.0\n").unwrap();

    let mut cmd = gifforge_cmd();
    cmd.args(["--config", config_file.to_str().unwrap(), "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Speed must be positive"));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = gifforge_cmd();
    cmd.arg("check-tools").assert().success().stdout(
        predicate::str::contains("ffmpeg").and(predicate::str::contains("ffprobe")),
    );
}

#[test]
fn test_cli_convert_invalid_speed_still_reports_selection_events() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("clip.mp4");
    fs::write(&input, b"small but acceptable").unwrap();

    let mut cmd = gifforge_cmd();
    cmd.current_dir(temp.path())
        .args(["convert", input.to_str().unwrap(), "--speed", "0", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Speed must be positive"))
        .stdout(predicate::str::contains(r#""event_type":"video_selected""#))
        .stdout(predicate::str::contains(r#""event_type":"settings_changed""#));
}
