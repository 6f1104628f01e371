mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./gifforge.toml", "~/.config/gifforge/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

fn expand_paths(config: &mut Config) {
    let expand =
        |p: &Path| Path::new(shellexpand::tilde(&p.to_string_lossy()).as_ref()).to_path_buf();

    if let Some(p) = config.tools.ffmpeg_path.as_mut() {
        *p = expand(p.as_path());
    }
    if let Some(p) = config.tools.ffprobe_path.as_mut() {
        *p = expand(p.as_path());
    }
    config.output.dir = expand(config.output.dir.as_path());
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.engine.exec_timeout_secs == 0 {
        anyhow::bail!("engine.exec_timeout_secs cannot be 0");
    }
    if config.engine.probe_timeout_secs == 0 {
        anyhow::bail!("engine.probe_timeout_secs cannot be 0");
    }

    crate::validation::check_settings(&config.defaults)
        .map_err(|e| anyhow::anyhow!("Invalid [defaults]: {}", e))?;

    for (name, path) in [
        ("ffmpeg", &config.tools.ffmpeg_path),
        ("ffprobe", &config.tools.ffprobe_path),
    ] {
        if let Some(p) = path {
            if !p.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", name, p);
            }
        }
    }

    Ok(())
}
