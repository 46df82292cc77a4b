//! Bounded, shared cache of keyframe maps.

use super::KeyframeMap;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Loads the keyframe map of a single video.
pub trait MapSource: Send + Sync {
    /// Returns `None` when the video has no usable map.
    fn load(&self, video_id: &str) -> Option<KeyframeMap>;
}

/// Reads `<video_id>_map.csv` files from a directory.
pub struct CsvMapSource {
    dir: PathBuf,
}

impl CsvMapSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the map file for a video.
    pub fn map_path(&self, video_id: &str) -> PathBuf {
        self.dir.join(format!("{}_map.csv", video_id))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MapSource for CsvMapSource {
    fn load(&self, video_id: &str) -> Option<KeyframeMap> {
        let path = self.map_path(video_id);
        if !path.exists() {
            debug!("No keyframe map for {}", video_id);
            return None;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read keyframe map for {}: {}", video_id, e);
                return None;
            }
        };

        let map = KeyframeMap::parse_csv(video_id, &content);
        match &map {
            Some(map) => debug!("Loaded {} keyframes for {}", map.len(), video_id),
            None => warn!("Keyframe map for {} has no usable rows", video_id),
        }
        map
    }
}

/// Process-wide keyframe map cache with least-recently-used eviction.
///
/// Absent maps are cached too, so a video without a map file is only probed
/// once until it is evicted. Concurrent misses for the same video may load it
/// more than once; the first value inserted is the one every caller sees.
pub struct KeyframeMapCache {
    source: Box<dyn MapSource>,
    entries: Mutex<LruCache<String, Option<Arc<KeyframeMap>>>>,
}

impl KeyframeMapCache {
    pub fn new(source: impl MapSource + 'static, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source: Box::new(source),
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cache reading CSV maps from `dir`.
    pub fn from_dir(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self::new(CsvMapSource::new(dir), capacity)
    }

    /// Get the map for a video, loading it on first access.
    pub fn get(&self, video_id: &str) -> Option<Arc<KeyframeMap>> {
        if let Some(cached) = self.lock().get(video_id) {
            return cached.clone();
        }

        // Load without holding the lock; other videos stay readable meanwhile.
        let loaded = self.source.load(video_id).map(Arc::new);

        let mut entries = self.lock();
        if let Some(existing) = entries.get(video_id) {
            return existing.clone();
        }
        entries.put(video_id.to_string(), loaded.clone());
        loaded
    }

    /// Number of videos currently cached, including absent maps.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Option<Arc<KeyframeMap>>>> {
        // Entries are immutable once inserted, so a poisoned lock is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
