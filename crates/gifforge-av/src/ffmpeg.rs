//! ffmpeg CLI implementation of [`TranscodeEngine`].
//!
//! Jobs run inside a private [`Workspace`]; progress is read from
//! `-progress pipe:1` on stdout and related to the input duration that ffmpeg
//! prints on stderr.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::command::{spawn_error, stderr_excerpt, ToolCommand};
use crate::engine::{ProgressFn, TranscodeEngine};
use crate::tools::get_tool_path;
use crate::workspace::Workspace;
use crate::{Error, Result};

const TOOL: &str = "ffmpeg";

/// Default limit for a single conversion job.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(600);

/// Arguments prepended to every job.
const BASE_ARGS: &[&str] = &["-hide_banner", "-nostdin", "-y", "-progress", "pipe:1", "-nostats"];

/// Number of stderr lines kept for error reporting.
const STDERR_TAIL: usize = 20;

/// Transcoding engine backed by the ffmpeg command-line tool.
#[derive(Debug)]
pub struct FfmpegEngine {
    configured_path: Option<PathBuf>,
    timeout: Duration,
    program: Option<PathBuf>,
    workspace: Option<Workspace>,
}

impl FfmpegEngine {
    /// Create an engine that resolves `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self {
            configured_path: None,
            timeout: DEFAULT_EXEC_TIMEOUT,
            program: None,
            workspace: None,
        }
    }

    /// Prefer an explicit ffmpeg binary over `PATH` lookup.
    pub fn with_path(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.configured_path = path.map(Into::into);
        self
    }

    /// Set the per-job execution timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn workspace(&self) -> Result<&Workspace> {
        self.workspace.as_ref().ok_or(Error::NotLoaded)
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    fn name(&self) -> &str {
        TOOL
    }

    fn is_loaded(&self) -> bool {
        self.program.is_some() && self.workspace.is_some()
    }

    async fn load(&mut self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }

        let program = get_tool_path(TOOL, self.configured_path.as_deref())?;
        let output = ToolCommand::new(program.clone())
            .arg("-version")
            .timeout(Duration::from_secs(15))
            .execute()
            .await?;
        let version = output.first_line().unwrap_or("ffmpeg").to_string();

        let workspace = Workspace::new()?;
        info!(
            program = %program.display(),
            workspace = %workspace.dir().display(),
            "Loaded {}",
            version
        );

        self.program = Some(program);
        self.workspace = Some(workspace);
        Ok(())
    }

    async fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.workspace()?.write(name, data).await
    }

    async fn exec(&mut self, args: &[String], on_progress: ProgressFn<'_>) -> Result<()> {
        let program = self.program.clone().ok_or(Error::NotLoaded)?;
        let dir = self.workspace()?.dir().to_path_buf();
        let window = ProgressWindow::from_args(args);

        debug!(args = ?args, "Running ffmpeg job");

        let mut child = spawn_job(&program, &dir, args)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::tool_failed(TOOL, "stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::tool_failed(TOOL, "stderr was not captured"))?;

        let (duration_tx, duration_rx) = watch::channel(None::<f64>);
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL);
            while let Ok(Some(line)) = lines.next_line().await {
                if duration_tx.borrow().is_none() {
                    if let Some(duration) = parse_duration_line(&line) {
                        let _ = duration_tx.send(Some(duration));
                    }
                }
                if tail.len() == STDERR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Vec::from(tail).join("\n")
        });

        let run = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                match parse_progress_line(&line) {
                    Some(ProgressLine::OutTime(secs)) => {
                        let expected = window.expected_secs(*duration_rx.borrow());
                        if let Some(total) = expected {
                            on_progress((secs / total).clamp(0.0, 1.0));
                        }
                    }
                    Some(ProgressLine::End) => on_progress(1.0),
                    None => {}
                }
            }
            let status = child.wait().await?;
            Ok::<ExitStatus, std::io::Error>(status)
        };
        let outcome = tokio::time::timeout(self.timeout, run).await;

        let status = match outcome {
            Ok(status) => status?,
            Err(_elapsed) => {
                warn!(timeout_secs = self.timeout.as_secs(), "ffmpeg job timed out");
                let _ = child.start_kill();
                return Err(Error::Timeout {
                    tool: TOOL.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let stderr_tail = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(Error::tool_failed(
                TOOL,
                format!("{}: {}", status, stderr_excerpt(&stderr_tail)),
            ));
        }

        Ok(())
    }

    async fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        self.workspace()?.read(name).await
    }

    async fn delete_file(&mut self, name: &str) -> Result<()> {
        self.workspace()?.remove(name).await
    }
}

fn spawn_job(program: &Path, dir: &Path, args: &[String]) -> Result<tokio::process::Child> {
    Command::new(program)
        .args(BASE_ARGS)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(TOOL, e))
}

/// Span of output time a job is expected to produce.
///
/// Derived from the trim bounds and the `setpts` multiplier in the job
/// arguments, and from the input duration once ffmpeg reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressWindow {
    start: Option<f64>,
    end: Option<f64>,
    pts_factor: f64,
}

impl Default for ProgressWindow {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            pts_factor: 1.0,
        }
    }
}

impl ProgressWindow {
    pub fn from_args(args: &[String]) -> Self {
        let mut window = Self::default();
        for pair in args.windows(2) {
            match pair[0].as_str() {
                "-ss" => window.start = parse_timestamp(&pair[1]),
                "-to" => window.end = parse_timestamp(&pair[1]),
                "-vf" | "-filter:v" => {
                    if let Some(factor) = parse_pts_factor(&pair[1]) {
                        window.pts_factor = factor;
                    }
                }
                _ => {}
            }
        }
        window
    }

    /// Expected output duration in seconds, if it can be known.
    pub fn expected_secs(&self, input_duration: Option<f64>) -> Option<f64> {
        let end = match (self.end, input_duration) {
            (Some(end), Some(duration)) => end.min(duration),
            (Some(end), None) => end,
            (None, Some(duration)) => duration,
            (None, None) => return None,
        };
        let span = (end - self.start.unwrap_or(0.0)).max(0.0) * self.pts_factor;
        (span > 0.0).then_some(span)
    }
}

/// A recognised line of `-progress` output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressLine {
    /// Output timestamp reached, in seconds.
    OutTime(f64),
    /// The job has finished writing.
    End,
}

/// Parse one `key=value` line of ffmpeg `-progress` output.
pub fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // out_time_ms is reported in microseconds as well.
        "out_time_us" | "out_time_ms" => value
            .parse::<i64>()
            .ok()
            .map(|us| ProgressLine::OutTime(us.max(0) as f64 / 1_000_000.0)),
        "progress" if value == "end" => Some(ProgressLine::End),
        _ => None,
    }
}

/// Parse the `Duration:` banner line ffmpeg prints for each input.
pub fn parse_duration_line(line: &str) -> Option<f64> {
    let rest = line.trim().strip_prefix("Duration:")?;
    let value = rest.split(',').next()?.trim();
    parse_timestamp(value).filter(|d| *d > 0.0)
}

/// Parse `HH:MM:SS(.fff)`, `MM:SS`, or plain seconds.
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let mut total = 0.0;
    for part in value.split(':') {
        let n: f64 = part.parse().ok()?;
        total = total * 60.0 + n;
    }
    Some(total)
}

fn parse_pts_factor(filter: &str) -> Option<f64> {
    filter
        .split(',')
        .find_map(|term| term.trim().strip_prefix("setpts="))
        .and_then(|expr| expr.strip_suffix("*PTS"))
        .and_then(|factor| factor.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_progress_line() {
        assert_eq!(
            parse_progress_line("out_time_us=2500000"),
            Some(ProgressLine::OutTime(2.5))
        );
        assert_eq!(
            parse_progress_line("out_time_ms=1000000"),
            Some(ProgressLine::OutTime(1.0))
        );
        assert_eq!(parse_progress_line("progress=end"), Some(ProgressLine::End));
        assert_eq!(parse_progress_line("progress=continue"), None);
        assert_eq!(parse_progress_line("out_time_us=N/A"), None);
        assert_eq!(parse_progress_line("frame=12"), None);
        assert_eq!(parse_progress_line("garbage"), None);
    }

    #[test]
    fn test_negative_out_time_clamps_to_zero() {
        assert_eq!(
            parse_progress_line("out_time_us=-5000"),
            Some(ProgressLine::OutTime(0.0))
        );
    }

    #[test]
    fn test_parse_duration_line() {
        assert_eq!(
            parse_duration_line("  Duration: 00:00:05.50, start: 0.000000, bitrate: 1205 kb/s"),
            Some(5.5)
        );
        assert_eq!(
            parse_duration_line("  Duration: 01:02:03.00, start: 0.0"),
            Some(3723.0)
        );
        assert_eq!(parse_duration_line("  Duration: N/A, bitrate: N/A"), None);
        assert_eq!(parse_duration_line("Stream #0:0: Video: h264"), None);
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1.5"), Some(1.5));
        assert_eq!(parse_timestamp("01:30"), Some(90.0));
        assert_eq!(parse_timestamp("00:00:02.25"), Some(2.25));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("abc"), None);
    }

    #[test]
    fn test_window_full_input() {
        let window = ProgressWindow::from_args(&strings(&[
            "-i",
            "input.mp4",
            "-vf",
            "fps=10,scale=320:-1",
            "output.gif",
        ]));
        assert_eq!(window.expected_secs(Some(10.0)), Some(10.0));
        assert_eq!(window.expected_secs(None), None);
    }

    #[test]
    fn test_window_trim_and_speed() {
        let window = ProgressWindow::from_args(&strings(&[
            "-ss",
            "2",
            "-to",
            "6",
            "-i",
            "input.mp4",
            "-vf",
            "fps=15,scale=240:-1,setpts=0.5*PTS",
            "output.gif",
        ]));
        // (6 - 2) seconds at double speed.
        assert_eq!(window.expected_secs(Some(30.0)), Some(2.0));
        // The end is capped by the input duration.
        assert_eq!(window.expected_secs(Some(4.0)), Some(1.0));
        // Trim end alone is enough to know the span.
        assert_eq!(window.expected_secs(None), Some(2.0));
    }

    #[test]
    fn test_window_matches_translated_job() {
        let settings = gifforge_common::ConversionSettings {
            speed: 2.0,
            start_time: Some(2.0),
            end_time: Some(6.0),
            ..Default::default()
        };
        let job = crate::build_args(&settings);
        let window = ProgressWindow::from_args(&job.args);
        // Four source seconds played at double speed.
        assert_eq!(window.expected_secs(Some(30.0)), Some(2.0));
    }

    #[test]
    fn test_window_empty_span() {
        let window = ProgressWindow::from_args(&strings(&["-ss", "10"]));
        assert_eq!(window.expected_secs(Some(5.0)), None);
    }

    #[test]
    fn test_engine_not_loaded() {
        let engine = FfmpegEngine::new();
        assert!(!engine.is_loaded());
        assert_eq!(engine.name(), "ffmpeg");
    }

    #[tokio::test]
    async fn test_exec_before_load_fails() {
        let mut engine = FfmpegEngine::new();
        let err = engine.exec(&strings(&["-version"]), &|_: f64| {}).await.unwrap_err();
        assert!(matches!(err, Error::NotLoaded));
        let err = engine.read_file("output.gif").await.unwrap_err();
        assert!(matches!(err, Error::NotLoaded));
    }

    #[tokio::test]
    async fn test_load_with_missing_binary() {
        let mut engine =
            FfmpegEngine::new().with_path(Some("/definitely/not/here/ffmpeg-missing"));
        // Falls back to PATH; either ffmpeg is installed or the tool is missing.
        match engine.load().await {
            Ok(()) => assert!(engine.is_loaded()),
            Err(e) => {
                assert!(!engine.is_loaded());
                assert!(matches!(
                    e,
                    Error::ToolNotFound { .. } | Error::ToolFailed { .. } | Error::Timeout { .. }
                ));
            }
        }
    }
}
