//! Per-video frame rates.
//!
//! The table is loaded once at startup from a JSON object mapping each video
//! ID to its frame rate, either as a bare number or as `{ "fps": number }`.
//! It can be generated from a directory of videos with `ffprobe`.

use crate::error::{FramefindError, Result};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Frame rate used when a video is unknown or has no usable rate.
pub const DEFAULT_FPS: f64 = 25.0;

/// Supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "m4v", "mpeg", "mpg"];

/// Maximum concurrent ffprobe processes.
const MAX_CONCURRENT_PROBES: usize = 4;

/// Read-only mapping from video ID to frames per second.
#[derive(Debug, Clone)]
pub struct FrameRateTable {
    rates: HashMap<String, f64>,
    default_fps: f64,
}

impl FrameRateTable {
    /// Create a table; a non-positive default falls back to [`DEFAULT_FPS`].
    pub fn new(rates: HashMap<String, f64>, default_fps: f64) -> Self {
        let default_fps = if usable(default_fps) { default_fps } else { DEFAULT_FPS };
        Self { rates, default_fps }
    }

    /// An empty table: every lookup yields the default rate.
    pub fn empty(default_fps: f64) -> Self {
        Self::new(HashMap::new(), default_fps)
    }

    /// Load the table from a JSON file. A missing file yields an empty table.
    pub fn load(path: &Path, default_fps: f64) -> Result<Self> {
        if !path.exists() {
            info!("No frame rate table at {:?}, using {} fps for every video", path, default_fps);
            return Ok(Self::empty(default_fps));
        }

        let content = std::fs::read_to_string(path)?;
        let table = Self::from_json(&content, default_fps)?;
        info!("Loaded frame rates for {} videos", table.len());
        Ok(table)
    }

    /// Parse the JSON form. Entries without a numeric rate are skipped.
    pub fn from_json(content: &str, default_fps: f64) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        let object = value.as_object().ok_or_else(|| {
            FramefindError::Config("Frame rate table must be a JSON object".to_string())
        })?;

        let mut rates = HashMap::with_capacity(object.len());
        for (video_id, record) in object {
            let fps = record
                .as_f64()
                .or_else(|| record.get("fps").and_then(Value::as_f64));
            match fps {
                Some(fps) => {
                    rates.insert(video_id.clone(), fps);
                }
                None => debug!("Skipping frame rate entry for {}: {}", video_id, record),
            }
        }

        Ok(Self::new(rates, default_fps))
    }

    /// Write the table as JSON, sorted by video ID.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let sorted: BTreeMap<&String, &f64> = self.rates.iter().collect();
        std::fs::write(path, serde_json::to_string_pretty(&sorted)?)?;
        Ok(())
    }

    /// Frames per second of a video, or the default when unknown or non-positive.
    pub fn fps(&self, video_id: &str) -> f64 {
        match self.rates.get(video_id) {
            Some(&fps) if usable(fps) => fps,
            _ => self.default_fps,
        }
    }

    pub fn default_fps(&self) -> f64 {
        self.default_fps
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl Default for FrameRateTable {
    fn default() -> Self {
        Self::empty(DEFAULT_FPS)
    }
}

fn usable(fps: f64) -> bool {
    fps.is_finite() && fps > 0.0
}

/// Parse an ffprobe rate such as `"30000/1001"` or `"25"`.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let fps = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    usable(fps).then_some(fps)
}

/// Probe the frame rate of the first video stream of a file.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn probe_video_fps(path: &Path) -> Result<Option<f64>> {
    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-select_streams",
            "v:0",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FramefindError::ToolNotFound("ffprobe".to_string())
            } else {
                FramefindError::ToolFailed(format!("Failed to run ffprobe: {}", e))
            }
        })?;

    if !output.status.success() {
        return Ok(None);
    }

    let json: Value = serde_json::from_slice(&output.stdout).unwrap_or_default();
    let stream = &json["streams"][0];

    Ok(["avg_frame_rate", "r_frame_rate"]
        .iter()
        .filter_map(|key| stream[*key].as_str())
        .find_map(parse_frame_rate))
}

/// Build a frame rate table by probing every video in a directory.
///
/// Files that cannot be probed are left out of the table.
pub async fn probe_frame_rates(videos_dir: &Path, default_fps: f64) -> Result<FrameRateTable> {
    let mut videos = Vec::new();
    for entry in std::fs::read_dir(videos_dir)? {
        let path = entry?.path();
        if is_video_file(&path) {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                videos.push((stem.to_string(), path));
            }
        }
    }
    videos.sort();

    info!("Probing frame rates of {} videos", videos.len());

    let results: Vec<(String, Result<Option<f64>>)> = stream::iter(videos)
        .map(|(video_id, path)| async move {
            let fps = probe_video_fps(&path).await;
            (video_id, fps)
        })
        .buffer_unordered(MAX_CONCURRENT_PROBES)
        .collect()
        .await;

    let mut rates = HashMap::with_capacity(results.len());
    for (video_id, result) in results {
        match result {
            Ok(Some(fps)) => {
                rates.insert(video_id, fps);
            }
            Ok(None) => warn!("Could not determine frame rate of {}", video_id),
            Err(e @ FramefindError::ToolNotFound(_)) => return Err(e),
            Err(e) => warn!("Probing {} failed: {}", video_id, e),
        }
    }

    Ok(FrameRateTable::new(rates, default_fps))
}

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
