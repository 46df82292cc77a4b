//! Keyframe timing data.
//!
//! A keyframe map records, for every keyframe extracted from a video, the
//! playback time it was captured at and (optionally) the frame number in the
//! source video. Maps are read from `<video_id>_map.csv` files with the columns
//! `FrameID`, `Seconds` and an optional `OriginalFrame`.

mod cache;
mod frame_rate;
mod matcher;

pub use cache::{CsvMapSource, KeyframeMapCache, MapSource};
pub use frame_rate::{parse_frame_rate, probe_frame_rates, probe_video_fps, FrameRateTable, DEFAULT_FPS};
pub use matcher::{resolve_nearest, resolve_nearest_one, NearestMatch};

use std::collections::HashMap;
use tracing::debug;

/// A single keyframe of a video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeEntry {
    /// Keyframe identifier, unique within its video.
    pub keyframe_index: i64,
    /// Capture time in seconds.
    pub timestamp_seconds: f64,
    /// Frame number in the source video, if recorded.
    pub original_frame: Option<i64>,
}

/// Immutable per-video keyframe timestamp map.
///
/// Entries are stored sorted by timestamp so nearest-time lookups can binary
/// search them.
#[derive(Debug, Clone)]
pub struct KeyframeMap {
    video_id: String,
    entries: Vec<KeyframeEntry>,
    timestamps: Vec<f64>,
    by_index: HashMap<i64, usize>,
}

impl KeyframeMap {
    /// Build a map from unordered entries.
    ///
    /// A keyframe index that appears more than once keeps its last entry.
    /// Returns `None` when no entries remain.
    pub fn from_entries(video_id: impl Into<String>, entries: Vec<KeyframeEntry>) -> Option<Self> {
        let mut latest: HashMap<i64, KeyframeEntry> = HashMap::with_capacity(entries.len());
        for entry in entries {
            latest.insert(entry.keyframe_index, entry);
        }
        if latest.is_empty() {
            return None;
        }

        let mut entries: Vec<KeyframeEntry> = latest.into_values().collect();
        entries.sort_by(|a, b| {
            a.timestamp_seconds
                .total_cmp(&b.timestamp_seconds)
                .then(a.keyframe_index.cmp(&b.keyframe_index))
        });

        let timestamps = entries.iter().map(|e| e.timestamp_seconds).collect();
        let by_index = entries
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.keyframe_index, pos))
            .collect();

        Some(Self {
            video_id: video_id.into(),
            entries,
            timestamps,
            by_index,
        })
    }

    /// Parse a map from CSV text, skipping malformed rows.
    ///
    /// Returns `None` when the header lacks `FrameID` or `Seconds`, or when no
    /// row survives parsing.
    pub fn parse_csv(video_id: &str, content: &str) -> Option<Self> {
        let mut lines = content.lines();
        let header = lines.next()?;
        let columns: Vec<String> = split_record(header)
            .map(|c| c.trim_start_matches('\u{feff}').to_string())
            .collect();

        let position = |name: &str| columns.iter().position(|c| c == name);
        let frame_col = position("FrameID")?;
        let seconds_col = position("Seconds")?;
        let original_col = position("OriginalFrame");

        let mut entries = Vec::new();
        for (row, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = split_record(line).collect();
            match parse_row(&fields, frame_col, seconds_col, original_col) {
                Some(entry) => entries.push(entry),
                None => debug!("Skipping malformed row {} in keyframe map for {}", row + 2, video_id),
            }
        }

        Self::from_entries(video_id, entries)
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Entries in ascending timestamp order.
    pub fn entries(&self) -> &[KeyframeEntry] {
        &self.entries
    }

    /// Timestamps in ascending order, parallel to [`entries`](Self::entries).
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Look up a keyframe by its identifier.
    pub fn get(&self, keyframe_index: i64) -> Option<&KeyframeEntry> {
        self.by_index.get(&keyframe_index).map(|&pos| &self.entries[pos])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn split_record(line: &str) -> impl Iterator<Item = &str> {
    line.split(',').map(|f| f.trim().trim_matches('"').trim())
}

fn parse_row(
    fields: &[&str],
    frame_col: usize,
    seconds_col: usize,
    original_col: Option<usize>,
) -> Option<KeyframeEntry> {
    let keyframe_index = fields.get(frame_col)?.parse::<i64>().ok()?;
    let timestamp_seconds = fields.get(seconds_col)?.parse::<f64>().ok()?;
    if !timestamp_seconds.is_finite() {
        return None;
    }

    let original_frame = match original_col.and_then(|col| fields.get(col)) {
        Some(raw) if !raw.is_empty() => Some(raw.parse::<i64>().ok()?),
        _ => None,
    };

    Some(KeyframeEntry {
        keyframe_index,
        timestamp_seconds,
        original_frame,
    })
}
