//! Keyframe to playback-time resolution.
//!
//! A vector-search hit only knows its keyframe index. The resolver turns that
//! index into a playback timestamp and a source frame number by trying an
//! ordered list of strategies:
//!
//! 1. [`MapLookup`] reads the video's keyframe map.
//! 2. [`FrameRateEstimate`] divides the index by the video's frame rate.
//!
//! Resolution never fails; when every strategy comes up empty the result is
//! the start of the video.

use crate::keyframe::{FrameRateTable, KeyframeMapCache};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

/// Playback position of a keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedFrame {
    pub timestamp_seconds: f64,
    pub original_frame: i64,
}

impl ResolvedFrame {
    /// Position derived from a timestamp and a frame rate.
    pub fn at(timestamp_seconds: f64, fps: f64) -> Self {
        Self {
            timestamp_seconds,
            original_frame: frame_at(timestamp_seconds, fps),
        }
    }
}

/// Source frame number for a timestamp, rounding halves to even.
pub fn frame_at(timestamp_seconds: f64, fps: f64) -> i64 {
    let frame = (timestamp_seconds * fps).round_ties_even();
    if frame.is_finite() {
        frame as i64
    } else {
        0
    }
}

/// A keyframe reference as received from an index or a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyframeRef {
    /// A proper keyframe index.
    Index(i64),
    /// A numeric value that is not an index; only usable for estimation.
    Approximate(f64),
    /// Nothing numeric at all.
    Invalid,
}

impl KeyframeRef {
    /// Interpret a loosely-typed value. Fractional numbers are truncated,
    /// numeric strings are parsed.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Index(i)
                } else {
                    match n.as_f64() {
                        Some(f) if f.is_finite() => Self::Index(f.trunc() as i64),
                        _ => Self::Invalid,
                    }
                }
            }
            Value::String(s) => Self::parse(s),
            _ => Self::Invalid,
        }
    }

    /// Interpret a textual value.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Index(i);
        }
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => Self::Approximate(f),
            _ => Self::Invalid,
        }
    }

    /// The index, if this is one.
    pub fn index(self) -> Option<i64> {
        match self {
            Self::Index(i) => Some(i),
            _ => None,
        }
    }

    fn as_f64(self) -> Option<f64> {
        match self {
            Self::Index(i) => Some(i as f64),
            Self::Approximate(f) => Some(f),
            Self::Invalid => None,
        }
    }
}

impl From<i64> for KeyframeRef {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

/// Outcome of a single resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Found(ResolvedFrame),
    NotFound,
}

/// One step of the resolution cascade.
pub trait ResolveStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Try to resolve a keyframe; `fps` is the video's effective frame rate.
    fn attempt(&self, video_id: &str, key: KeyframeRef, fps: f64) -> Resolution;
}

/// Looks the keyframe up in the video's keyframe map.
pub struct MapLookup {
    cache: Arc<KeyframeMapCache>,
}

impl MapLookup {
    pub fn new(cache: Arc<KeyframeMapCache>) -> Self {
        Self { cache }
    }
}

impl ResolveStrategy for MapLookup {
    fn name(&self) -> &'static str {
        "keyframe-map"
    }

    fn attempt(&self, video_id: &str, key: KeyframeRef, fps: f64) -> Resolution {
        let Some(index) = key.index() else {
            return Resolution::NotFound;
        };
        let Some(map) = self.cache.get(video_id) else {
            return Resolution::NotFound;
        };
        match map.get(index) {
            Some(entry) => Resolution::Found(ResolvedFrame {
                timestamp_seconds: entry.timestamp_seconds,
                original_frame: entry
                    .original_frame
                    .unwrap_or_else(|| frame_at(entry.timestamp_seconds, fps)),
            }),
            None => Resolution::NotFound,
        }
    }
}

/// Treats the keyframe index as a frame number at the video's frame rate.
pub struct FrameRateEstimate;

impl ResolveStrategy for FrameRateEstimate {
    fn name(&self) -> &'static str {
        "frame-rate"
    }

    fn attempt(&self, _video_id: &str, key: KeyframeRef, fps: f64) -> Resolution {
        match key.as_f64() {
            Some(value) => Resolution::Found(ResolvedFrame::at(value / fps, fps)),
            None => Resolution::NotFound,
        }
    }
}

/// Resolves keyframes to playback positions.
pub struct FrameResolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
    frame_rates: Arc<FrameRateTable>,
}

impl FrameResolver {
    /// Resolver that consults the keyframe map before estimating.
    pub fn new(cache: Arc<KeyframeMapCache>, frame_rates: Arc<FrameRateTable>) -> Self {
        Self::with_strategies(
            vec![Box::new(MapLookup::new(cache)), Box::new(FrameRateEstimate)],
            frame_rates,
        )
    }

    /// Resolver with a custom strategy order.
    pub fn with_strategies(
        strategies: Vec<Box<dyn ResolveStrategy>>,
        frame_rates: Arc<FrameRateTable>,
    ) -> Self {
        Self {
            strategies,
            frame_rates,
        }
    }

    /// Resolve a keyframe index.
    pub fn resolve(&self, video_id: &str, keyframe_index: i64) -> ResolvedFrame {
        self.resolve_ref(video_id, KeyframeRef::Index(keyframe_index))
    }

    /// Resolve a keyframe reference of any shape.
    pub fn resolve_ref(&self, video_id: &str, key: KeyframeRef) -> ResolvedFrame {
        let fps = self.fps(video_id);
        for strategy in &self.strategies {
            if let Resolution::Found(frame) = strategy.attempt(video_id, key, fps) {
                trace!("{}:{:?} resolved by {}", video_id, key, strategy.name());
                return frame;
            }
        }
        ResolvedFrame {
            timestamp_seconds: 0.0,
            original_frame: 0,
        }
    }

    /// Effective frame rate of a video.
    pub fn fps(&self, video_id: &str) -> f64 {
        self.frame_rates.fps(video_id)
    }

    pub fn frame_rates(&self) -> &FrameRateTable {
        &self.frame_rates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::{KeyframeMap, MapSource};
    use serde_json::json;
    use std::collections::HashMap;

    /// Serves a fixed map for "mapped" and nothing for other videos.
    struct FixedSource;

    impl MapSource for FixedSource {
        fn load(&self, video_id: &str) -> Option<KeyframeMap> {
            if video_id != "mapped" {
                return None;
            }
            KeyframeMap::parse_csv(
                video_id,
                "FrameID,Seconds,OriginalFrame\n0,0.0,0\n1,2.0,\n2,4.4,132\n",
            )
        }
    }

    fn resolver() -> FrameResolver {
        let mut rates = HashMap::new();
        rates.insert("mapped".to_string(), 30.0);
        rates.insert("fast".to_string(), 50.0);
        rates.insert("broken".to_string(), -1.0);

        FrameResolver::new(
            Arc::new(KeyframeMapCache::new(FixedSource, 8)),
            Arc::new(FrameRateTable::new(rates, 25.0)),
        )
    }

    #[test]
    fn test_map_entry_wins() {
        let r = resolver();
        let frame = r.resolve("mapped", 2);
        assert_eq!(frame.timestamp_seconds, 4.4);
        assert_eq!(frame.original_frame, 132);
    }

    #[test]
    fn test_map_entry_without_original_frame() {
        let r = resolver();
        let frame = r.resolve("mapped", 1);
        assert_eq!(frame.timestamp_seconds, 2.0);
        assert_eq!(frame.original_frame, 60);
    }

    #[test]
    fn test_index_missing_from_map_uses_frame_rate() {
        let r = resolver();
        let frame = r.resolve("mapped", 90);
        assert_eq!(frame.timestamp_seconds, 3.0);
        assert_eq!(frame.original_frame, 90);
    }

    #[test]
    fn test_fallback_is_index_over_fps() {
        let r = resolver();
        for k in [0_i64, 1, 7, 25, 333, 100_000] {
            assert_eq!(r.resolve("fast", k).timestamp_seconds, k as f64 / 50.0);
            assert_eq!(r.resolve("unknown", k).timestamp_seconds, k as f64 / 25.0);
        }
    }

    #[test]
    fn test_non_positive_fps_uses_default() {
        let r = resolver();
        assert_eq!(r.fps("broken"), 25.0);
        assert_eq!(r.resolve("broken", 50).timestamp_seconds, 2.0);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let r = resolver();
        assert_eq!(r.resolve("mapped", 2), r.resolve("mapped", 2));
        assert_eq!(r.resolve("unknown", 13), r.resolve("unknown", 13));
    }

    #[test]
    fn test_loose_references() {
        let r = resolver();

        let from_string = r.resolve_ref("mapped", KeyframeRef::from_value(&json!("2")));
        assert_eq!(from_string.timestamp_seconds, 4.4);

        let truncated = r.resolve_ref("mapped", KeyframeRef::from_value(&json!(2.9)));
        assert_eq!(truncated.timestamp_seconds, 4.4);

        let approximate = r.resolve_ref("unknown", KeyframeRef::from_value(&json!("12.5")));
        assert_eq!(approximate.timestamp_seconds, 0.5);
        assert_eq!(approximate.original_frame, 12);

        let invalid = r.resolve_ref("mapped", KeyframeRef::from_value(&json!("abc")));
        assert_eq!(invalid, ResolvedFrame { timestamp_seconds: 0.0, original_frame: 0 });

        let null = r.resolve_ref("mapped", KeyframeRef::from_value(&Value::Null));
        assert_eq!(null.original_frame, 0);
    }

    #[test]
    fn test_strategy_order_is_respected() {
        let rates = Arc::new(FrameRateTable::empty(25.0));
        let estimate_only = FrameResolver::with_strategies(vec![Box::new(FrameRateEstimate)], rates);
        assert_eq!(estimate_only.resolve("mapped", 2).timestamp_seconds, 0.08);

        let none = FrameResolver::with_strategies(Vec::new(), Arc::new(FrameRateTable::default()));
        assert_eq!(none.resolve("mapped", 2).timestamp_seconds, 0.0);
    }

    #[test]
    fn test_frame_rounding_ties_to_even() {
        assert_eq!(frame_at(0.1, 25.0), 2);
        assert_eq!(frame_at(2.5, 1.0), 2);
        assert_eq!(frame_at(3.5, 1.0), 4);
        assert_eq!(frame_at(f64::NAN, 25.0), 0);
    }
}
