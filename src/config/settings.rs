//! Configuration settings for Framefind.

use crate::http::DEFAULT_TIMEOUT_SECS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub keyframes: KeyframeSettings,
    pub encoder: EncoderSettings,
    pub vector_search: VectorSearchSettings,
    pub text_search: TextSearchSettings,
    pub ingest: IngestSettings,
    pub server: ServerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.framefind".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Keyframe extraction output and timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyframeSettings {
    /// Directory holding extracted keyframe images, one sub-directory per video.
    pub keyframes_dir: String,
    /// Directory holding `<video_id>_map.csv` keyframe timestamp maps.
    pub maps_dir: String,
    /// Maximum number of keyframe maps kept in memory.
    pub cache_capacity: usize,
    /// Frame rate assumed when a video has no usable recorded rate.
    pub default_fps: f64,
    /// JSON file with per-video frame rates.
    pub frame_rates_path: String,
    /// Directory holding the source videos.
    pub videos_dir: String,
}

impl Default for KeyframeSettings {
    fn default() -> Self {
        Self {
            keyframes_dir: "~/.framefind/keyframes".to_string(),
            maps_dir: "~/.framefind/keyframes/maps".to_string(),
            cache_capacity: 2048,
            default_fps: 25.0,
            frame_rates_path: "~/.framefind/frame_rates.json".to_string(),
            videos_dir: "~/.framefind/videos".to_string(),
        }
    }
}

/// Text encoder service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Endpoint that turns a text query into an embedding.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8001/encode".to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Keyframe vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSearchSettings {
    /// Base URL of the vector database REST API.
    pub endpoint: String,
    /// Collection holding one vector per keyframe.
    pub collection: String,
    /// Name of the vector field.
    pub vector_field: String,
    /// Similarity metric (COSINE, L2, IP).
    pub metric_type: String,
    /// Number of clusters probed per query.
    pub nprobe: u32,
    /// Maximum number of keyframe hits per query.
    pub max_results: usize,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for VectorSearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:19530".to_string(),
            collection: "keyframes".to_string(),
            vector_field: "keyframe_vector".to_string(),
            metric_type: "COSINE".to_string(),
            nprobe: 10,
            max_results: 500,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Transcript full-text index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSearchSettings {
    /// Base URL of the search cluster.
    pub endpoint: String,
    /// Index holding transcript segments.
    pub index: String,
    /// Maximum number of transcript hits per query.
    pub max_results: usize,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for TextSearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9200".to_string(),
            index: "transcripts".to_string(),
            max_results: 200,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Transcript ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Directory with Whisper JSON or CSV transcripts.
    pub transcripts_dir: String,
    /// Number of documents per bulk request.
    pub bulk_chunk_size: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            transcripts_dir: "~/.framefind/transcripts".to_string(),
            bulk_chunk_size: 2000,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::FramefindError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("framefind")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    pub fn keyframes_dir(&self) -> PathBuf {
        Self::expand_path(&self.keyframes.keyframes_dir)
    }

    pub fn maps_dir(&self) -> PathBuf {
        Self::expand_path(&self.keyframes.maps_dir)
    }

    pub fn frame_rates_path(&self) -> PathBuf {
        Self::expand_path(&self.keyframes.frame_rates_path)
    }

    pub fn videos_dir(&self) -> PathBuf {
        Self::expand_path(&self.keyframes.videos_dir)
    }

    pub fn transcripts_dir(&self) -> PathBuf {
        Self::expand_path(&self.ingest.transcripts_dir)
    }
}
