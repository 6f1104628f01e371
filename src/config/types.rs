use gifforge_common::ConversionSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    /// Settings a fresh session starts from.
    #[serde(default)]
    pub defaults: ConversionSettings,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Upper bound for one conversion job
    #[serde(default = "default_exec_timeout")]
    pub exec_timeout_secs: u64,

    /// Upper bound for reading video metadata
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_exec_timeout() -> u64 {
    600
}

fn default_probe_timeout() -> u64 {
    30
}

impl EngineConfig {
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exec_timeout_secs: default_exec_timeout(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Where downloaded GIFs are written
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}
