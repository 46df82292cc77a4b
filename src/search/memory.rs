//! In-memory search backends.
//!
//! Useful for testing and small datasets.

use super::{KeyframeHit, KeyframeSearch, TextEncoder, TranscriptHit, TranscriptSearch};
use crate::error::{FramefindError, Result};
use crate::ingest::{TranscriptDocument, TranscriptIndexer};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

struct StoredKeyframe {
    video_id: String,
    keyframe_index: i64,
    vector: Vec<f32>,
}

/// In-memory keyframe vector index with exhaustive cosine search.
#[derive(Default)]
pub struct MemoryKeyframeIndex {
    keyframes: RwLock<Vec<StoredKeyframe>>,
}

impl MemoryKeyframeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, video_id: &str, keyframe_index: i64, vector: Vec<f32>) {
        let mut keyframes = self.keyframes.write().unwrap_or_else(PoisonError::into_inner);
        keyframes.push(StoredKeyframe {
            video_id: video_id.to_string(),
            keyframe_index,
            vector,
        });
    }
}

#[async_trait]
impl KeyframeSearch for MemoryKeyframeIndex {
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<KeyframeHit>> {
        let keyframes = self.keyframes.read().unwrap_or_else(PoisonError::into_inner);

        let mut hits: Vec<KeyframeHit> = keyframes
            .iter()
            .map(|kf| KeyframeHit {
                video_id: kf.video_id.clone(),
                keyframe_index: kf.keyframe_index,
                distance: cosine_similarity(vector, &kf.vector),
            })
            .collect();

        hits.sort_by(|a, b| b.distance.total_cmp(&a.distance));
        hits.truncate(limit);

        Ok(hits)
    }
}

/// In-memory transcript index scored by the number of query terms a segment
/// contains.
#[derive(Default)]
pub struct MemoryTranscriptIndex {
    documents: RwLock<HashMap<String, TranscriptDocument>>,
}

impl MemoryTranscriptIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self) -> usize {
        self.documents.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// All stored documents of a video, ordered by start time.
    pub fn documents_for(&self, video_id: &str) -> Vec<TranscriptDocument> {
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        let mut result: Vec<TranscriptDocument> = documents
            .values()
            .filter(|d| d.video_id == video_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.start.total_cmp(&b.start));
        result
    }
}

#[async_trait]
impl TranscriptSearch for MemoryTranscriptIndex {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TranscriptHit>> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        let mut hits: Vec<TranscriptHit> = documents
            .values()
            .filter_map(|doc| {
                let text = doc.text.to_lowercase();
                let matched = terms.iter().filter(|t| text.contains(t.as_str())).count();
                (matched > 0).then(|| TranscriptHit {
                    video_id: doc.video_id.clone(),
                    keyframe_index: doc.keyframe_index,
                    start: doc.start,
                    end: Some(doc.end),
                    text: doc.text.clone(),
                    score: matched as f64,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);

        Ok(hits)
    }
}

#[async_trait]
impl TranscriptIndexer for MemoryTranscriptIndex {
    async fn recreate(&self) -> Result<()> {
        self.documents.write().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(())
    }

    async fn ensure_exists(&self) -> Result<()> {
        Ok(())
    }

    async fn bulk_index(&self, docs: &[TranscriptDocument]) -> Result<usize> {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        for doc in docs {
            documents.insert(doc.id.clone(), doc.clone());
        }
        Ok(docs.len())
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }
}

/// Encoder with a fixed vocabulary of query embeddings.
#[derive(Default)]
pub struct StaticEncoder {
    vectors: HashMap<String, Vec<f32>>,
}

impl StaticEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl TextEncoder for StaticEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| FramefindError::Encoder(format!("No embedding for '{}'", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_keyframe_index_ranks_by_similarity() {
        let index = MemoryKeyframeIndex::new();
        index.insert("v1", 1, vec![1.0, 0.0]);
        index.insert("v1", 2, vec![0.7, 0.7]);
        index.insert("v2", 1, vec![0.0, 1.0]);

        let hits = index.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!((hits[0].video_id.as_str(), hits[0].keyframe_index), ("v1", 1));
        assert_eq!((hits[1].video_id.as_str(), hits[1].keyframe_index), ("v1", 2));
    }

    #[tokio::test]
    async fn test_transcript_index_roundtrip() {
        let index = MemoryTranscriptIndex::new();
        let doc = |id: &str, text: &str| TranscriptDocument {
            id: id.to_string(),
            video_id: "v1".to_string(),
            keyframe_index: 1,
            start: 0.0,
            end: 1.0,
            text: text.to_string(),
        };

        index
            .bulk_index(&[doc("a", "The red car stops"), doc("b", "A blue boat")])
            .await
            .unwrap();

        let hits = index.search("red car", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 2.0);

        index.recreate().await.unwrap();
        assert_eq!(index.document_count(), 0);
    }

    #[test]
    fn test_static_encoder() {
        let encoder = StaticEncoder::new().with("cat", vec![1.0]);
        assert_eq!(tokio_test::block_on(encoder.encode("cat")).unwrap(), vec![1.0]);
        assert!(tokio_test::block_on(encoder.encode("dog")).is_err());
    }
}
