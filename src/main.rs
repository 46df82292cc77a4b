//! Framefind CLI entry point.

use anyhow::Result;
use clap::Parser;
use framefind::cli::{commands, Cli, Commands};
use framefind::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_deref()
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("framefind={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match cli.command {
        Commands::Search {
            description,
            transcript,
            limit,
        } => {
            commands::run_search(description, transcript, limit, &settings).await?;
        }

        Commands::Resolve {
            video_id,
            keyframe_index,
        } => {
            commands::run_resolve(&video_id, &keyframe_index, &settings)?;
        }

        Commands::Ingest { append, dir } => {
            commands::run_ingest(append, dir, &settings).await?;
        }

        Commands::ProbeFps { dir } => {
            commands::run_probe_fps(dir, &settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, port, &settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, &settings, &config_path)?;
        }
    }

    Ok(())
}
