//! CLI command implementations.

mod config;
mod ingest;
mod probe;
mod resolve;
mod search;
mod serve;

pub use config::run_config;
pub use ingest::run_ingest;
pub use probe::run_probe_fps;
pub use resolve::run_resolve;
pub use search::run_search;
pub use serve::run_serve;

use crate::config::Settings;
use crate::keyframe::{FrameRateTable, KeyframeMapCache};
use crate::resolver::FrameResolver;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// Keyframe map cache and frame rate table from the configured locations.
fn keyframe_sources(settings: &Settings) -> Result<(Arc<KeyframeMapCache>, Arc<FrameRateTable>)> {
    let maps = KeyframeMapCache::from_dir(settings.maps_dir(), settings.keyframes.cache_capacity);
    let rates = FrameRateTable::load(&settings.frame_rates_path(), settings.keyframes.default_fps)?;
    debug!("Loaded frame rates for {} videos", rates.len());
    Ok((Arc::new(maps), Arc::new(rates)))
}

fn frame_resolver(settings: &Settings) -> Result<Arc<FrameResolver>> {
    let (maps, rates) = keyframe_sources(settings)?;
    Ok(Arc::new(FrameResolver::new(maps, rates)))
}
