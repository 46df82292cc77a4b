//! Resolve command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::format_timestamp;
use crate::resolver::KeyframeRef;
use anyhow::Result;

/// Run the resolve command.
pub fn run_resolve(video_id: &str, keyframe_index: &str, settings: &Settings) -> Result<()> {
    let resolver = super::frame_resolver(settings)?;
    let key = KeyframeRef::parse(keyframe_index);
    if key.index().is_none() {
        Output::warning(&format!("'{}' is not a keyframe index, estimating", keyframe_index));
    }

    let frame = resolver.resolve_ref(video_id, key);

    Output::header(&format!("{} #{}", video_id, keyframe_index));
    Output::kv("Time", &format!("{} ({:.3}s)", format_timestamp(frame.timestamp_seconds), frame.timestamp_seconds));
    Output::kv("Frame", &frame.original_frame.to_string());
    Output::kv("FPS", &format!("{:.3}", resolver.fps(video_id)));

    Ok(())
}
