//! Identity intersection of result sets from different modalities.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::debug;

/// Something with a cross-modality identity.
pub trait Identified {
    type Key: Eq + Hash;

    fn identity(&self) -> Self::Key;
}

/// Keep only the items whose identity appears in every result set.
///
/// - no sets: empty result
/// - one set: returned unchanged
/// - otherwise: one item per surviving identity, taken from the first set
///   (within that set the last item with a given identity wins)
///
/// Sets are pulled lazily and no further set is consumed once the running
/// intersection is empty. Output order is unspecified.
pub fn intersect<T, I>(result_sets: I) -> Vec<T>
where
    T: Identified,
    I: IntoIterator<Item = Vec<T>>,
{
    let mut sets = result_sets.into_iter();
    let Some(first) = sets.next() else {
        return Vec::new();
    };
    let mut rest = sets.peekable();
    if rest.peek().is_none() {
        return first;
    }

    let mut survivors: HashMap<T::Key, T> = first
        .into_iter()
        .map(|item| (item.identity(), item))
        .collect();

    let mut intersected = 1;
    if !survivors.is_empty() {
        for set in rest {
            let ids: HashSet<T::Key> = set.iter().map(Identified::identity).collect();
            survivors.retain(|key, _| ids.contains(key));
            intersected += 1;
            if survivors.is_empty() {
                break;
            }
        }
    }

    debug!("Intersected {} result sets into {} items", intersected, survivors.len());
    survivors.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{HitKey, HitPayload, RetrievalHit};
    use std::cell::Cell;

    fn hit(video_id: &str, keyframe_index: i64, score: f32) -> RetrievalHit {
        RetrievalHit {
            video_id: video_id.to_string(),
            keyframe_index,
            start_seconds: keyframe_index as f64 / 25.0,
            frame_number: keyframe_index,
            payload: HitPayload::Visual { clip_score: score },
        }
    }

    fn keys(items: &[RetrievalHit]) -> HashSet<HitKey> {
        items.iter().map(Identified::identity).collect()
    }

    fn key(video_id: &str, keyframe_index: i64) -> HitKey {
        HitKey {
            video_id: video_id.to_string(),
            keyframe_index,
        }
    }

    #[test]
    fn test_no_sets() {
        let sets: Vec<Vec<RetrievalHit>> = Vec::new();
        assert!(intersect(sets).is_empty());
    }

    #[test]
    fn test_single_set_passthrough() {
        let a = vec![hit("v1", 1, 0.9), hit("v1", 1, 0.8), hit("v2", 5, 0.7)];
        assert_eq!(intersect(vec![a.clone()]), a);
    }

    #[test]
    fn test_true_set_intersection() {
        let a = vec![hit("v1", 1, 0.1), hit("v1", 2, 0.2), hit("v2", 5, 0.3)];
        let b = vec![hit("v2", 6, 0.4), hit("v2", 5, 0.5), hit("v1", 2, 0.6)];

        let expected: HashSet<HitKey> = [key("v1", 2), key("v2", 5)].into_iter().collect();
        assert_eq!(keys(&intersect(vec![a.clone(), b.clone()])), expected);

        let mut a_rev = a;
        a_rev.reverse();
        let mut b_rev = b;
        b_rev.reverse();
        assert_eq!(keys(&intersect(vec![a_rev, b_rev])), expected);
    }

    #[test]
    fn test_payload_comes_from_first_set() {
        let visual = vec![hit("v1", 2, 0.9)];
        let spoken = vec![RetrievalHit {
            payload: HitPayload::Transcript {
                transcript_text: "hello".to_string(),
                transcript_score: 7.0,
                end: None,
            },
            ..hit("v1", 2, 0.0)
        }];

        let fused = intersect(vec![visual, spoken]);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].payload, HitPayload::Visual { clip_score: 0.9 });
    }

    #[test]
    fn test_duplicates_collapse() {
        let a = vec![hit("v1", 1, 0.1), hit("v1", 1, 0.2), hit("v1", 3, 0.3)];
        let b = vec![hit("v1", 1, 0.5), hit("v1", 1, 0.6)];

        let fused = intersect(vec![a, b]);
        assert_eq!(fused.len(), 1);
        // Last duplicate in the first set wins.
        assert_eq!(fused[0].payload, HitPayload::Visual { clip_score: 0.2 });
    }

    #[test]
    fn test_stops_pulling_sets_once_empty() {
        let pulled = Cell::new(0);
        let sets = (0..3).map(|i| {
            pulled.set(pulled.get() + 1);
            match i {
                0 => vec![hit("v1", 1, 0.1)],
                1 => vec![hit("v2", 1, 0.1)],
                _ => vec![hit("v1", 1, 0.1)],
            }
        });

        assert!(intersect(sets).is_empty());
        assert_eq!(pulled.get(), 2);
    }

    #[test]
    fn test_three_way_intersection() {
        let a = vec![hit("v1", 1, 0.1), hit("v1", 2, 0.1), hit("v1", 3, 0.1)];
        let b = vec![hit("v1", 2, 0.1), hit("v1", 3, 0.1)];
        let c = vec![hit("v1", 3, 0.1), hit("v9", 9, 0.1)];

        let expected: HashSet<HitKey> = [key("v1", 3)].into_iter().collect();
        assert_eq!(keys(&intersect(vec![a, b, c])), expected);
    }

    #[test]
    fn test_empty_member_set() {
        let a = vec![hit("v1", 1, 0.1)];
        assert!(intersect(vec![a, Vec::new()]).is_empty());
    }
}
