mod cli;

use gifforge::{
    config,
    conversion::{
        ConversionOrchestrator, ConvertOutcome, ConverterEvent, EngineGateway, Stage,
        VideoDescriptor,
    },
    export::{DirectoryDownloads, FileClipboard},
};
use gifforge_av::{FfmpegEngine, FfprobeProbe, MetadataProbe};
use gifforge_common::paths::format_file_size;
use gifforge_common::SettingsUpdate;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Options for a single `convert` run.
struct ConvertRequest {
    input: PathBuf,
    update: SettingsUpdate,
    output_dir: Option<PathBuf>,
    media_type: Option<String>,
    frame: Option<PathBuf>,
    json: bool,
}

async fn convert_file(request: ConvertRequest, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    anyhow::ensure!(
        request.input.exists(),
        "Input file does not exist: {:?}",
        request.input
    );

    let ffmpeg_path = config.tools.ffmpeg_path.clone();
    let exec_timeout = config.engine.exec_timeout();
    let gateway = EngineGateway::new(move || {
        FfmpegEngine::new()
            .with_path(ffmpeg_path.clone())
            .with_timeout(exec_timeout)
    });
    let probe = FfprobeProbe::new()
        .with_path(config.tools.ffprobe_path.clone())
        .with_timeout(config.engine.probe_timeout());
    let output_dir = request.output_dir.unwrap_or_else(|| config.output.dir.clone());

    let mut orchestrator = ConversionOrchestrator::new(Arc::new(gateway), Arc::new(probe))
        .with_settings(config.defaults.clone())
        .with_downloads(Arc::new(DirectoryDownloads::new(output_dir)));
    if let Some(ref frame) = request.frame {
        orchestrator = orchestrator.with_clipboard(Arc::new(FileClipboard::new(frame.clone())));
    }

    let reporter = tokio::spawn(report_events(orchestrator.subscribe(), request.json));

    let video = VideoDescriptor::from_file(&request.input, request.media_type.as_deref())
        .await
        .with_context(|| format!("Failed to read {:?}", request.input))?;
    tracing::info!(
        "Selected {} ({}, {})",
        video.name,
        video.media_type,
        format_file_size(video.size)
    );

    let validation = orchestrator.select_video(video).await;
    if !validation.is_valid {
        drain(orchestrator, reporter).await;
        anyhow::bail!("{}", validation.message());
    }

    orchestrator.update_settings(request.update);
    let result = run_conversion(&orchestrator, request.frame.as_deref()).await;

    drain(orchestrator, reporter).await;
    result
}

/// Check the merged settings, convert, and export the result.
async fn run_conversion(
    orchestrator: &ConversionOrchestrator,
    frame: Option<&Path>,
) -> Result<()> {
    gifforge::validation::check_settings(&orchestrator.settings())
        .map_err(|e| anyhow::anyhow!("Invalid settings: {}", e))?;

    match orchestrator.convert_to_gif().await {
        ConvertOutcome::Completed { ref file_name, size } => {
            tracing::info!("Created {} ({})", file_name, format_file_size(size));
            finish_exports(orchestrator, frame).await
        }
        ConvertOutcome::Failed { error } => Err(anyhow::anyhow!("Conversion failed: {}", error)),
        other => Err(anyhow::anyhow!("Conversion did not run: {:?}", other)),
    }
}

/// Close the event channel and wait for the reporter to flush what is queued.
async fn drain(orchestrator: ConversionOrchestrator, reporter: tokio::task::JoinHandle<()>) {
    drop(orchestrator);
    if let Err(e) = reporter.await {
        tracing::debug!("Event reporter stopped: {}", e);
    }
}

async fn finish_exports(orchestrator: &ConversionOrchestrator, frame: Option<&Path>) -> Result<()> {
    let saved = orchestrator.download_artifact().await?;
    println!("{}", saved.display());

    if let Some(frame) = frame {
        orchestrator.copy_artifact_as_image().await?;
        println!("{}", frame.display());
    }
    Ok(())
}

async fn report_events(mut events: broadcast::Receiver<ConverterEvent>, json: bool) {
    let mut last_decile = None;
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Event reporter skipped {} events", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to serialize event: {}", e),
            }
            continue;
        }

        match event {
            ConverterEvent::StateChanged { state } => match state.stage {
                Stage::Processing => {
                    let decile = state.progress / 10;
                    if last_decile != Some(decile) {
                        last_decile = Some(decile);
                        tracing::info!("{}", state.feedback);
                    }
                }
                Stage::Error => {
                    tracing::error!("{}", state.error.as_deref().unwrap_or(&state.feedback));
                }
                _ if !state.feedback.is_empty() => tracing::info!("{}", state.feedback),
                _ => {}
            },
            ConverterEvent::VideoSelected {
                metadata: Some(meta), ..
            } => {
                tracing::info!(
                    "Source is {} and {:.2}s long",
                    meta.dimensions,
                    meta.duration_secs
                );
            }
            other => tracing::debug!("{:?}", other),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose.
    let default_filter = if cli.verbose {
        "gifforge=trace,gifforge_av=debug,gifforge_common=debug"
    } else {
        "gifforge=info,gifforge_av=info"
    };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            input,
            speed,
            quality,
            size,
            start,
            end,
            no_loop,
            output_dir,
            media_type,
            frame,
            json,
        } => {
            let update = SettingsUpdate {
                speed,
                quality,
                size,
                start_time: start.map(Some),
                end_time: end.map(Some),
                loop_forever: no_loop.then_some(Some(false)),
            };
            let request = ConvertRequest {
                input,
                update,
                output_dir,
                media_type,
                frame,
                json,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_file(request, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("gifforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    anyhow::ensure!(file.exists(), "Input file does not exist: {:?}", file);

    let config = config::load_config_or_default(config_path)?;
    let video = VideoDescriptor::from_file(file, None)
        .await
        .with_context(|| format!("Failed to read {:?}", file))?;
    let validation = gifforge::validation::validate_video(video.size, &video.media_type);

    let probe = FfprobeProbe::new()
        .with_path(config.tools.ffprobe_path.clone())
        .with_timeout(config.engine.probe_timeout());
    let metadata = probe.probe(&video.bytes).await?;

    if json {
        let report = serde_json::json!({
            "file": file,
            "media_type": video.media_type,
            "size": video.size,
            "metadata": metadata,
            "validation": validation,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("File: {}", file.display());
        println!("Type: {}", video.media_type);
        println!("Size: {}", format_file_size(video.size));
        println!("Dimensions: {}", metadata.dimensions);
        println!("Duration: {:.3}s", metadata.duration_secs);
        if validation.is_valid {
            println!("Accepted for conversion");
        } else {
            println!("Not accepted: {}", validation.message());
        }
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let tools = gifforge_av::check_tools(
        config.tools.ffmpeg_path.as_deref(),
        config.tools.ffprobe_path.as_deref(),
    );

    for tool in &tools {
        let mark = if tool.available { "ok" } else { "missing" };
        let detail = match (&tool.version, &tool.path) {
            (Some(version), Some(path)) => format!("{} at {}", version, path.display()),
            (None, Some(path)) => format!("not runnable at {}", path.display()),
            _ => "not found".to_string(),
        };
        println!("{:<8} {:<8} ({}) {}", mark, tool.name, tool.purpose, detail);
    }

    let missing: Vec<&str> = tools
        .iter()
        .filter(|t| !t.available)
        .map(|t| t.name.as_str())
        .collect();
    if missing.is_empty() {
        println!("\nReady to convert.");
    } else {
        println!("\nMissing: {}. Install ffmpeg to enable conversion.", missing.join(", "));
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = if let Some(path) = path {
        let config = config::load_config(path)?;
        println!("Configuration is valid: {}", path.display());
        config
    } else {
        println!("No config file given, using defaults");
        config::Config::default()
    };

    print_config(&config);
    Ok(())
}

fn print_config(config: &config::Config) {
    let defaults = &config.defaults;
    println!("  Engine timeout: {}s", config.engine.exec_timeout_secs);
    println!("  Probe timeout: {}s", config.engine.probe_timeout_secs);
    println!(
        "  Defaults: speed {}x, quality {}, size {}, loop {}",
        defaults.speed,
        defaults.quality,
        defaults.size,
        defaults.loops_forever()
    );
    println!("  Output dir: {}", config.output.dir.display());
}
