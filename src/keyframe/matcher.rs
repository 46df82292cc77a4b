//! Nearest-timestamp matching against a keyframe map.
//!
//! Used at ingest time to snap transcript segment start times onto the
//! closest extracted keyframe.

use super::KeyframeMap;

/// The keyframe chosen for one target time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestMatch {
    pub keyframe_index: i64,
    /// Timestamp of the chosen keyframe.
    pub resolved_seconds: f64,
}

/// Find the nearest keyframe for every target time.
///
/// Returns one match per target, in target order, or `None` when there is no
/// map or the map has no timestamps. When a target lies exactly halfway
/// between two keyframes the earlier one wins.
pub fn resolve_nearest(map: Option<&KeyframeMap>, targets: &[f64]) -> Option<Vec<NearestMatch>> {
    let map = map?;
    let timestamps = map.timestamps();
    if timestamps.is_empty() {
        return None;
    }

    let last = timestamps.len() - 1;
    let entries = map.entries();

    let matches = targets
        .iter()
        .map(|&target| {
            let insertion = timestamps.partition_point(|&t| t < target);
            let right = insertion.min(last);
            let left = insertion.saturating_sub(1).min(last);

            let diff_left = (target - timestamps[left]).abs();
            let diff_right = (target - timestamps[right]).abs();
            let best = if diff_left <= diff_right { left } else { right };

            NearestMatch {
                keyframe_index: entries[best].keyframe_index,
                resolved_seconds: timestamps[best],
            }
        })
        .collect();

    Some(matches)
}

/// Single-target form of [`resolve_nearest`].
pub fn resolve_nearest_one(map: Option<&KeyframeMap>, target: f64) -> Option<NearestMatch> {
    resolve_nearest(map, &[target])?.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::KeyframeEntry;

    fn sample_map() -> KeyframeMap {
        let entries = [(10, 1.0), (11, 3.0), (12, 5.0)]
            .into_iter()
            .map(|(keyframe_index, timestamp_seconds)| KeyframeEntry {
                keyframe_index,
                timestamp_seconds,
                original_frame: None,
            })
            .collect();
        KeyframeMap::from_entries("v1", entries).unwrap()
    }

    fn ids(matches: &[NearestMatch]) -> Vec<i64> {
        matches.iter().map(|m| m.keyframe_index).collect()
    }

    #[test]
    fn test_nearest_with_left_bias() {
        let map = sample_map();
        let matches = resolve_nearest(Some(&map), &[0.0, 2.0, 2.9, 4.0, 6.0]).unwrap();
        assert_eq!(ids(&matches), vec![10, 10, 11, 11, 12]);
    }

    #[test]
    fn test_midpoint_prefers_earlier() {
        let map = sample_map();
        let m = resolve_nearest_one(Some(&map), 2.0).unwrap();
        assert_eq!(m.keyframe_index, 10);
        assert_eq!(m.resolved_seconds, 1.0);
    }

    #[test]
    fn test_exact_hit_and_bounds() {
        let map = sample_map();
        assert_eq!(resolve_nearest_one(Some(&map), 3.0).unwrap().keyframe_index, 11);
        assert_eq!(resolve_nearest_one(Some(&map), -100.0).unwrap().keyframe_index, 10);
        assert_eq!(resolve_nearest_one(Some(&map), 1e9).unwrap().keyframe_index, 12);
        assert_eq!(resolve_nearest_one(Some(&map), 5.0).unwrap().resolved_seconds, 5.0);
    }

    #[test]
    fn test_batch_matches_scalar() {
        let map = sample_map();
        let targets: Vec<f64> = (0..=70).map(|i| i as f64 * 0.1 - 0.5).collect();

        let batch = resolve_nearest(Some(&map), &targets).unwrap();
        let scalar: Vec<NearestMatch> = targets
            .iter()
            .map(|&t| resolve_nearest_one(Some(&map), t).unwrap())
            .collect();

        assert_eq!(batch, scalar);
    }

    #[test]
    fn test_absent_map() {
        assert!(resolve_nearest(None, &[1.0]).is_none());
        assert!(resolve_nearest_one(None, 1.0).is_none());
    }

    #[test]
    fn test_empty_targets() {
        let map = sample_map();
        assert!(resolve_nearest(Some(&map), &[]).unwrap().is_empty());
    }

    #[test]
    fn test_single_entry_map() {
        let map = KeyframeMap::from_entries(
            "v1",
            vec![KeyframeEntry {
                keyframe_index: 4,
                timestamp_seconds: 2.0,
                original_frame: Some(50),
            }],
        )
        .unwrap();

        let matches = resolve_nearest(Some(&map), &[0.0, 2.0, 9.0]).unwrap();
        assert_eq!(ids(&matches), vec![4, 4, 4]);
    }
}
