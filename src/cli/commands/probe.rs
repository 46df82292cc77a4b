//! Frame rate probing command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::keyframe::probe_frame_rates;
use anyhow::Result;

/// Run the probe-fps command.
pub async fn run_probe_fps(dir: Option<String>, settings: &Settings) -> Result<()> {
    preflight::check(Operation::ProbeFrameRates, settings)?;

    let videos_dir = match dir {
        Some(d) => Settings::expand_path(&d),
        None => settings.videos_dir(),
    };
    if !videos_dir.is_dir() {
        anyhow::bail!("Video directory not found: {}", videos_dir.display());
    }

    let spinner = Output::spinner(&format!("Probing videos in {}...", videos_dir.display()));
    let table = probe_frame_rates(&videos_dir, settings.keyframes.default_fps).await;
    spinner.finish_and_clear();
    let table = table?;

    let path = settings.frame_rates_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    table.save(&path)?;

    Output::success(&format!("Saved frame rates of {} videos", table.len()));
    Output::kv("Table", &path.display().to_string());
    Ok(())
}
