//! imgbatch CLI: batch resize and recompress images.
//!
//! Reads IMGBATCH_* settings from the environment (or `.env`). Remote mode
//! sends the whole batch to IMGBATCH_API_URL in a single request.

use anyhow::Context;
use clap::{Parser, Subcommand};
use imgbatch_cli::{build_engine, collect_files, init_tracing, write_outputs, TerminalSink};
use imgbatch_core::{Config, EngineMode, Preset, TransformConfig};
use imgbatch_processing::LocalTransformEngine;
use imgbatch_worker::{export_archive, status, BatchCoordinator, Session};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "imgbatch", about = "Batch image resizer")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resize and recompress images
    Process {
        /// Image files or directories (expanded one level)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Preset name (original, square, portrait, widescreen) or WxH selector
        #[arg(long)]
        preset: Option<String>,
        /// Encode quality, 1-100
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
        /// Where to transform: local or remote
        #[arg(long)]
        mode: Option<EngineMode>,
        /// Only process the item at this position (0-based)
        #[arg(long)]
        only: Option<usize>,
        /// Output directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Also pack every image into resized_<ms>.zip
        #[arg(long)]
        zip: bool,
        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// List available presets
    Presets,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize report")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    match cli.command {
        Commands::Presets => {
            for preset in Preset::ALL {
                println!("{}", preset);
            }
        }
        Commands::Process {
            paths,
            preset,
            quality,
            mode,
            only,
            out_dir,
            zip,
            json,
        } => {
            let config = Config::from_env().context("Invalid configuration")?;
            let preset = preset
                .map(|p| Preset::from_selector(&p))
                .unwrap_or(config.default_preset);
            let quality = quality.unwrap_or(config.default_quality);
            let mode = mode.unwrap_or(config.default_mode);
            let out_dir = out_dir.unwrap_or_else(|| config.output_dir.clone());
            let transform = TransformConfig::resolve(preset, quality);

            let session = Arc::new(Session::from_config(&config));
            let files = collect_files(&paths).await?;
            let ingested = session.ingest(files).await;
            for name in &ingested.skipped {
                eprintln!("Skipped {} (not an image)", name);
            }
            if session.is_empty().await {
                anyhow::bail!("Add some images first");
            }
            eprintln!("{}", status::idle_summary(&session.summary().await));

            let engine = build_engine(mode, &config)?;
            let sink = Arc::new(TerminalSink::new(&session.items().await, mode));
            let coordinator = BatchCoordinator::new(Arc::clone(&session), sink);

            let cancel_on = Arc::clone(&session);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel_on.cancel();
                }
            });

            let report = match only {
                Some(index) => {
                    let id = session
                        .id_at(index)
                        .await
                        .with_context(|| format!("No image at position {}", index))?;
                    coordinator
                        .process_one(id, engine.as_ref(), &transform)
                        .await?
                }
                None => {
                    coordinator
                        .process_all(engine.as_ref(), &transform)
                        .await?
                }
            };

            for failure in &report.failed {
                eprintln!("Failed {}: {}", failure.name, failure.error);
            }
            eprintln!("{}", status::reduction_summary(&report.summary));

            let written = write_outputs(&session.items().await, &out_dir).await?;
            tracing::info!(files = written.len(), dir = %out_dir.display(), "Outputs written");

            if zip {
                let mut err = std::io::stderr();
                let archive = export_archive(
                    &session,
                    &LocalTransformEngine::new(),
                    &transform,
                    |percent| {
                        let _ = write!(err, "\rArchiving {:>3}%", percent);
                    },
                )
                .await?;
                eprintln!();
                let path = archive.write_to(&out_dir).await?;
                eprintln!("Archive: {}", path.display());
            }

            if json {
                print_json(&report)?;
            }
        }
    }

    imgbatch_infra::shutdown_telemetry().await;
    Ok(())
}
