//! One-shot external tool invocations with captured output and a deadline.
//!
//! Used for short calls (version checks, ffprobe). Long-running conversion
//! jobs stream their output and are driven by [`crate::ffmpeg`] instead.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// Deadline for short tool calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of stderr lines quoted in failure messages.
const ERROR_CONTEXT_LINES: usize = 5;

/// Captured result of a successful invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ToolOutput {
    /// First non-empty line of stdout, which is where version banners live.
    pub fn first_line(&self) -> Option<&str> {
        self.stdout.lines().map(str::trim).find(|l| !l.is_empty())
    }
}

/// An external program plus arguments, run to completion.
///
/// ```no_run
/// use gifforge_av::ToolCommand;
///
/// # async fn example() -> gifforge_av::Result<()> {
/// let output = ToolCommand::new("ffmpeg").arg("-version").execute().await?;
/// println!("{}", output.first_line().unwrap_or_default());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the program and wait for it, killing it if the deadline passes.
    ///
    /// A non-zero exit is reported as [`Error::ToolFailed`] quoting the end
    /// of stderr.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let tool = program_name(&self.program);
        let started = Instant::now();

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&tool, e))?;

        // Dropping the timed-out future drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Timeout {
                tool: tool.clone(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| Error::tool_failed(&tool, format!("failed to collect output: {e}")))?;

        let elapsed = started.elapsed();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(
            tool = %tool,
            status = %output.status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Tool finished"
        );

        if !output.status.success() {
            return Err(Error::tool_failed(
                tool,
                format!("{}: {}", output.status, stderr_excerpt(&stderr)),
            ));
        }

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
            elapsed,
        })
    }
}

/// Map a spawn failure to a missing-tool or generic failure error.
pub(crate) fn spawn_error(tool: &str, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::tool_not_found(tool)
    } else {
        Error::tool_failed(tool, format!("failed to start: {err}"))
    }
}

/// The last few non-empty lines of a stderr capture, joined with `; `.
pub(crate) fn stderr_excerpt(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let skip = lines.len().saturating_sub(ERROR_CONTEXT_LINES);
    lines[skip..].join("; ")
}

/// File name of a program path, for messages.
pub(crate) fn program_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string_lossy().into_owned())
}
