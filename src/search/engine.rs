//! Query-time search: run each requested modality, resolve playback
//! positions, fuse the result sets.

use super::{
    intersect, ElasticTranscriptIndex, HitPayload, HttpTextEncoder, KeyframeSearch,
    MilvusKeyframeIndex, ResultSet, RetrievalHit, TextEncoder, TranscriptSearch,
};
use crate::config::Settings;
use crate::error::{FramefindError, Result};
use crate::resolver::{FrameResolver, KeyframeRef, ResolvedFrame};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// A combined visual and spoken-word query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    /// Natural-language description of what is on screen.
    #[serde(default)]
    pub description: Option<String>,
    /// Words spoken in the video.
    #[serde(default)]
    pub transcript: Option<String>,
    /// Older clients send the spoken-word query under this name.
    #[serde(default)]
    pub audio: Option<String>,
}

impl SearchRequest {
    pub fn description(&self) -> Option<&str> {
        non_blank(self.description.as_deref())
    }

    /// The spoken-word query, from `transcript` or else `audio`.
    pub fn transcript(&self) -> Option<&str> {
        non_blank(self.transcript.as_deref()).or_else(|| non_blank(self.audio.as_deref()))
    }

    pub fn is_empty(&self) -> bool {
        self.description().is_none() && self.transcript().is_none()
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// A fused hit annotated with its video's frame rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub hit: RetrievalHit,
    pub fps: f64,
}

/// Runs searches against the external indexes.
pub struct SearchEngine {
    encoder: Arc<dyn TextEncoder>,
    keyframes: Arc<dyn KeyframeSearch>,
    transcripts: Arc<dyn TranscriptSearch>,
    resolver: Arc<FrameResolver>,
    visual_limit: usize,
    transcript_limit: usize,
}

impl SearchEngine {
    pub fn new(
        encoder: Arc<dyn TextEncoder>,
        keyframes: Arc<dyn KeyframeSearch>,
        transcripts: Arc<dyn TranscriptSearch>,
        resolver: Arc<FrameResolver>,
    ) -> Self {
        Self {
            encoder,
            keyframes,
            transcripts,
            resolver,
            visual_limit: 500,
            transcript_limit: 200,
        }
    }

    /// Engine backed by the configured encoder and indexes.
    pub fn from_settings(settings: &Settings, resolver: Arc<FrameResolver>) -> Result<Self> {
        let encoder = HttpTextEncoder::new(
            &settings.encoder.endpoint,
            Duration::from_secs(settings.encoder.timeout_seconds),
        )?;
        let keyframes = MilvusKeyframeIndex::new(&settings.vector_search)?;
        let transcripts = ElasticTranscriptIndex::new(&settings.text_search)?;

        Ok(Self::new(
            Arc::new(encoder),
            Arc::new(keyframes),
            Arc::new(transcripts),
            resolver,
        )
        .with_limits(
            settings.vector_search.max_results,
            settings.text_search.max_results,
        ))
    }

    /// Set the per-modality result limits.
    pub fn with_limits(mut self, visual_limit: usize, transcript_limit: usize) -> Self {
        self.visual_limit = visual_limit;
        self.transcript_limit = transcript_limit;
        self
    }

    pub fn resolver(&self) -> &Arc<FrameResolver> {
        &self.resolver
    }

    /// Resolve keyframes on the blocking pool, since a cache miss reads the
    /// map file from disk. Frames come back in input order.
    pub async fn resolve_all(&self, keys: Vec<(String, KeyframeRef)>) -> Result<Vec<ResolvedFrame>> {
        let resolver = Arc::clone(&self.resolver);
        let frames: Vec<ResolvedFrame> = tokio::task::spawn_blocking(move || {
            keys.iter()
                .map(|(video_id, key)| resolver.resolve_ref(video_id, *key))
                .collect()
        })
        .await?;
        Ok(frames)
    }

    /// Keyframes whose visual content matches a description.
    #[instrument(skip(self))]
    pub async fn clip_search(&self, description: &str, limit: usize) -> Result<ResultSet> {
        if description.trim().is_empty() {
            warn!("Visual search requested without a description");
            return Ok(Vec::new());
        }

        let vector = self.encoder.encode(description).await?;
        let hits = self.keyframes.search(&vector, limit).await?;
        let frames = self
            .resolve_all(
                hits.iter()
                    .map(|h| (h.video_id.clone(), KeyframeRef::Index(h.keyframe_index)))
                    .collect(),
            )
            .await?;

        Ok(hits
            .into_iter()
            .zip(frames)
            .map(|(hit, frame)| {
                RetrievalHit {
                    video_id: hit.video_id,
                    keyframe_index: hit.keyframe_index,
                    start_seconds: frame.timestamp_seconds,
                    frame_number: frame.original_frame,
                    payload: HitPayload::Visual {
                        clip_score: hit.distance,
                    },
                }
            })
            .collect())
    }

    /// Keyframes whose transcript segment matches the spoken words.
    #[instrument(skip(self))]
    pub async fn transcript_search(&self, text: &str, limit: usize) -> Result<ResultSet> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.transcripts.search(text, limit).await?;
        let frames = self
            .resolve_all(
                hits.iter()
                    .map(|h| (h.video_id.clone(), KeyframeRef::Index(h.keyframe_index)))
                    .collect(),
            )
            .await?;

        Ok(hits
            .into_iter()
            .zip(frames)
            .map(|(hit, frame)| {
                RetrievalHit {
                    video_id: hit.video_id,
                    keyframe_index: hit.keyframe_index,
                    start_seconds: hit.start,
                    frame_number: frame.original_frame,
                    payload: HitPayload::Transcript {
                        transcript_text: hit.text,
                        transcript_score: hit.score,
                        end: hit.end,
                    },
                }
            })
            .collect())
    }

    /// Run every modality present in the request and keep the keyframes
    /// matched by all of them.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        if request.is_empty() {
            return Err(FramefindError::InvalidInput(
                "Provide a description or a transcript query".to_string(),
            ));
        }

        let visual = async {
            match request.description() {
                Some(description) => self.clip_search(description, self.visual_limit).await.map(Some),
                None => Ok(None),
            }
        };
        let spoken = async {
            match request.transcript() {
                Some(text) => self.transcript_search(text, self.transcript_limit).await.map(Some),
                None => Ok(None),
            }
        };

        let (visual, spoken) = tokio::try_join!(visual, spoken)?;
        let result_sets: Vec<ResultSet> = [visual, spoken].into_iter().flatten().collect();
        info!("Intersecting {} result sets", result_sets.len());

        let results: Vec<SearchResult> = intersect(result_sets)
            .into_iter()
            .map(|hit| {
                let fps = self.resolver.fps(&hit.video_id);
                SearchResult { hit, fps }
            })
            .collect();

        info!("Search completed with {} results", results.len());
        Ok(results)
    }
}
