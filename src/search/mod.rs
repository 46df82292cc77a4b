//! Multi-modal keyframe search.
//!
//! Visual search embeds a description and queries a keyframe vector index;
//! transcript search queries a full-text index of spoken segments. Both yield
//! [`RetrievalHit`]s keyed by `(video_id, keyframe_index)`, which
//! [`intersect`] fuses into a single answer set.

mod elastic;
mod encoder;
mod engine;
mod fusion;
mod memory;
mod milvus;

pub use elastic::ElasticTranscriptIndex;
pub use encoder::HttpTextEncoder;
pub use engine::{SearchEngine, SearchRequest, SearchResult};
pub use fusion::{intersect, Identified};
pub use memory::{cosine_similarity, MemoryKeyframeIndex, MemoryTranscriptIndex, StaticEncoder};
pub use milvus::MilvusKeyframeIndex;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A keyframe returned by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeHit {
    pub video_id: String,
    pub keyframe_index: i64,
    /// Similarity reported by the index; opaque to fusion.
    pub distance: f32,
}

/// A transcript segment returned by the text index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptHit {
    pub video_id: String,
    pub keyframe_index: i64,
    /// Segment start, already snapped to its keyframe at ingest time.
    pub start: f64,
    pub end: Option<f64>,
    pub text: String,
    pub score: f64,
}

/// Modality-specific part of a hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HitPayload {
    Visual {
        clip_score: f32,
    },
    Transcript {
        transcript_text: String,
        transcript_score: f64,
        end: Option<f64>,
    },
}

/// One search result from a single retrieval modality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalHit {
    pub video_id: String,
    pub keyframe_index: i64,
    /// Playback position of the keyframe.
    pub start_seconds: f64,
    /// Frame number in the source video.
    pub frame_number: i64,
    #[serde(flatten)]
    pub payload: HitPayload,
}

/// Identity of a hit across modalities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HitKey {
    pub video_id: String,
    pub keyframe_index: i64,
}

impl Identified for RetrievalHit {
    type Key = HitKey;

    fn identity(&self) -> HitKey {
        HitKey {
            video_id: self.video_id.clone(),
            keyframe_index: self.keyframe_index,
        }
    }
}

/// Hits from one modality for one query.
pub type ResultSet = Vec<RetrievalHit>;

/// Turns a text query into an embedding in the keyframe vector space.
#[async_trait]
pub trait TextEncoder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;
}

/// Approximate nearest-neighbour search over keyframe embeddings.
#[async_trait]
pub trait KeyframeSearch: Send + Sync {
    /// Most similar keyframes first.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<KeyframeHit>>;
}

/// Full-text search over transcript segments.
#[async_trait]
pub trait TranscriptSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TranscriptHit>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_serializes_flat() {
        let hit = RetrievalHit {
            video_id: "v1".to_string(),
            keyframe_index: 4,
            start_seconds: 1.5,
            frame_number: 37,
            payload: HitPayload::Visual { clip_score: 0.25 },
        };

        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["video_id"], "v1");
        assert_eq!(json["frame_number"], 37);
        assert_eq!(json["clip_score"], 0.25);
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn test_identity_ignores_payload() {
        let visual = RetrievalHit {
            video_id: "v1".to_string(),
            keyframe_index: 4,
            start_seconds: 1.5,
            frame_number: 37,
            payload: HitPayload::Visual { clip_score: 0.9 },
        };
        let spoken = RetrievalHit {
            start_seconds: 1.6,
            payload: HitPayload::Transcript {
                transcript_text: "hello".to_string(),
                transcript_score: 3.2,
                end: Some(2.0),
            },
            ..visual.clone()
        };

        assert_eq!(visual.identity(), spoken.identity());
    }
}
