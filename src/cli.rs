use clap::{Parser, Subcommand};
use gifforge_common::{Quality, SizeTier};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gifforge")]
#[command(author, version, about = "Convert short videos into animated GIFs")]
pub struct Cli {
    /// Config file (defaults to ./gifforge.toml, then ~/.config/gifforge/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log engine and state details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a video into an animated GIF
    Convert {
        /// Video file to convert
        input: PathBuf,

        /// Playback speed multiplier
        #[arg(long)]
        speed: Option<f64>,

        /// Frame rate and scale tier (low, medium, high)
        #[arg(short, long)]
        quality: Option<Quality>,

        /// Output width tier (small, medium, large)
        #[arg(short, long)]
        size: Option<SizeTier>,

        /// Trim start, in seconds
        #[arg(long)]
        start: Option<f64>,

        /// Trim end, in seconds
        #[arg(long)]
        end: Option<f64>,

        /// Play the GIF once instead of looping
        #[arg(long)]
        no_loop: bool,

        /// Directory to save the GIF in (overrides config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Declared media type, when the extension is misleading
        #[arg(long)]
        media_type: Option<String>,

        /// Also write the first frame as a PNG to this path
        #[arg(long)]
        frame: Option<PathBuf>,

        /// Print state events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Probe a video file and display its duration and dimensions
    Probe {
        /// Video file to inspect
        file: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report whether ffmpeg and ffprobe can be found and run
    CheckTools,

    /// Load a configuration file and print the effective settings
    Validate {
        /// File to check; falls back to --config
        config: Option<PathBuf>,
    },

    /// Print the gifforge version
    Version,
}
