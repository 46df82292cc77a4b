//! Keyframe vector search over the Milvus REST API.

use super::{KeyframeHit, KeyframeSearch};
use crate::config::VectorSearchSettings;
use crate::error::{FramefindError, Result};
use crate::http::create_client_with_timeout;
use crate::resolver::KeyframeRef;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Vector index holding one embedding per keyframe, with `video_id` and
/// `keyframe_index` scalar fields.
pub struct MilvusKeyframeIndex {
    client: reqwest::Client,
    search_url: Url,
    collection: String,
    vector_field: String,
    metric_type: String,
    nprobe: u32,
}

impl MilvusKeyframeIndex {
    pub fn new(settings: &VectorSearchSettings) -> Result<Self> {
        let base = Url::parse(&settings.endpoint)?;
        Ok(Self {
            client: create_client_with_timeout(Duration::from_secs(settings.timeout_seconds))?,
            search_url: base.join("/v2/vectordb/entities/search")?,
            collection: settings.collection.clone(),
            vector_field: settings.vector_field.clone(),
            metric_type: settings.metric_type.clone(),
            nprobe: settings.nprobe,
        })
    }

    fn search_body(&self, vector: &[f32], limit: usize) -> Value {
        json!({
            "collectionName": self.collection,
            "data": [vector],
            "annsField": self.vector_field,
            "limit": limit,
            "outputFields": ["video_id", "keyframe_index"],
            "searchParams": {
                "metricType": self.metric_type,
                "params": { "nprobe": self.nprobe },
            },
        })
    }
}

/// Extract keyframe hits from a search response body.
///
/// Rows without a video ID or an integral keyframe index are dropped.
fn parse_search_response(body: &Value) -> Result<Vec<KeyframeHit>> {
    let code = body["code"].as_i64().unwrap_or(0);
    if code != 0 {
        let message = body["message"].as_str().unwrap_or("unknown error");
        return Err(FramefindError::VectorSearch(format!("code {}: {}", code, message)));
    }

    let rows = match body["data"].as_array() {
        Some(rows) => rows,
        None => return Ok(Vec::new()),
    };

    let hits = rows
        .iter()
        .filter_map(|row| {
            let video_id = row["video_id"].as_str()?;
            let keyframe_index = KeyframeRef::from_value(&row["keyframe_index"]).index();
            let Some(keyframe_index) = keyframe_index else {
                warn!("Dropping vector hit for {} without keyframe index", video_id);
                return None;
            };
            Some(KeyframeHit {
                video_id: video_id.to_string(),
                keyframe_index,
                distance: row["distance"].as_f64().unwrap_or(0.0) as f32,
            })
        })
        .collect();

    Ok(hits)
}

#[async_trait]
impl KeyframeSearch for MilvusKeyframeIndex {
    #[instrument(skip(self, vector), fields(collection = %self.collection))]
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<KeyframeHit>> {
        debug!("Searching {} keyframes", limit);

        let response = self
            .client
            .post(self.search_url.clone())
            .json(&self.search_body(vector, limit))
            .send()
            .await
            .map_err(|e| FramefindError::VectorSearch(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FramefindError::VectorSearch(format!("{}: {}", status, body)));
        }

        let body: Value = response.json().await?;
        let hits = parse_search_response(&body)?;
        info!("Vector search found {} keyframes", hits.len());
        Ok(hits)
    }
}
