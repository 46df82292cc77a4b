//! Transcript full-text index on Elasticsearch.

use super::{TranscriptHit, TranscriptSearch};
use crate::config::TextSearchSettings;
use crate::error::{FramefindError, Result};
use crate::http::create_client_with_timeout;
use crate::ingest::{TranscriptDocument, TranscriptIndexer};
use crate::resolver::KeyframeRef;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Transcript segments indexed by video, keyframe and text.
pub struct ElasticTranscriptIndex {
    client: reqwest::Client,
    base: Url,
    index: String,
}

impl ElasticTranscriptIndex {
    pub fn new(settings: &TextSearchSettings) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(Duration::from_secs(settings.timeout_seconds))?,
            base: Url::parse(&settings.endpoint)?,
            index: settings.index.clone(),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(&format!("{}{}", self.index, path))?)
    }

    /// Index mapping: keyword IDs, numeric times and a text field with a
    /// search-as-you-type sub-field for prefix queries.
    fn index_definition() -> Value {
        json!({
            "mappings": {
                "properties": {
                    "video_id": { "type": "keyword" },
                    "keyframe_index": { "type": "long" },
                    "start": { "type": "float" },
                    "end": { "type": "float" },
                    "text": {
                        "type": "text",
                        "fields": {
                            "as_you_type": { "type": "search_as_you_type" }
                        }
                    }
                }
            }
        })
    }

    fn query_body(query: &str, limit: usize) -> Value {
        json!({
            "size": limit,
            "query": {
                "bool": {
                    "should": [
                        { "match": { "text": { "query": query, "fuzziness": "AUTO" } } },
                        { "match_phrase": { "text": { "query": query } } },
                        { "match": { "text.as_you_type": { "query": query } } }
                    ],
                    "minimum_should_match": 1
                }
            },
            "_source": ["video_id", "keyframe_index", "start", "end", "text"]
        })
    }

    async fn create_index(&self) -> Result<()> {
        let response = self
            .client
            .put(self.url("")?)
            .json(&Self::index_definition())
            .send()
            .await?;
        check_status(response, "create index").await?;
        info!("Created transcript index '{}'", self.index);
        Ok(())
    }

    async fn index_exists(&self) -> Result<bool> {
        let response = self.client.head(self.url("")?).send().await?;
        Ok(response.status().is_success())
    }
}

async fn check_status(response: reqwest::Response, action: &str) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FramefindError::TextSearch(format!("{} failed ({}): {}", action, status, body)));
    }
    Ok(response.json().await.unwrap_or(Value::Null))
}

/// Extract transcript hits from a search response body.
///
/// Hits without an integral keyframe index have no identity and are dropped.
fn parse_search_response(body: &Value) -> Vec<TranscriptHit> {
    let Some(hits) = body["hits"]["hits"].as_array() else {
        return Vec::new();
    };

    hits.iter()
        .filter_map(|hit| {
            let source = &hit["_source"];
            let video_id = source["video_id"].as_str()?;
            let Some(keyframe_index) = KeyframeRef::from_value(&source["keyframe_index"]).index() else {
                debug!("Dropping transcript hit for {} without keyframe index", video_id);
                return None;
            };
            Some(TranscriptHit {
                video_id: video_id.to_string(),
                keyframe_index,
                start: source["start"].as_f64().unwrap_or(0.0),
                end: source["end"].as_f64(),
                text: source["text"].as_str().unwrap_or_default().to_string(),
                score: hit["_score"].as_f64().unwrap_or(0.0),
            })
        })
        .collect()
}

/// Build the newline-delimited body of a bulk index request.
fn bulk_body(index: &str, docs: &[TranscriptDocument]) -> Result<String> {
    let mut body = String::new();
    for doc in docs {
        body.push_str(&serde_json::to_string(&json!({ "index": { "_index": index, "_id": doc.id } }))?);
        body.push('\n');
        body.push_str(&serde_json::to_string(doc)?);
        body.push('\n');
    }
    Ok(body)
}

/// Count successfully indexed items in a bulk response.
fn bulk_successes(body: &Value) -> usize {
    body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter(|item| {
                    item["index"]["status"]
                        .as_u64()
                        .is_some_and(|status| (200..300).contains(&status))
                })
                .count()
        })
        .unwrap_or(0)
}

#[async_trait]
impl TranscriptSearch for ElasticTranscriptIndex {
    #[instrument(skip(self), fields(index = %self.index))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TranscriptHit>> {
        let response = self
            .client
            .post(self.url("/_search")?)
            .json(&Self::query_body(query, limit))
            .send()
            .await
            .map_err(|e| FramefindError::TextSearch(format!("Request failed: {}", e)))?;

        let body = check_status(response, "search").await?;
        let hits = parse_search_response(&body);
        info!("Transcript search found {} segments", hits.len());
        Ok(hits)
    }
}

#[async_trait]
impl TranscriptIndexer for ElasticTranscriptIndex {
    async fn recreate(&self) -> Result<()> {
        let response = self.client.delete(self.url("")?).send().await?;
        if response.status() != StatusCode::NOT_FOUND {
            check_status(response, "delete index").await?;
            info!("Deleted transcript index '{}'", self.index);
        }
        self.create_index().await
    }

    async fn ensure_exists(&self) -> Result<()> {
        if self.index_exists().await? {
            debug!("Transcript index '{}' already exists", self.index);
            return Ok(());
        }
        self.create_index().await
    }

    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn bulk_index(&self, docs: &[TranscriptDocument]) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }

        let response = self
            .client
            .post(self.base.join("_bulk")?)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(bulk_body(&self.index, docs)?)
            .send()
            .await?;

        let body = check_status(response, "bulk index").await?;
        let indexed = bulk_successes(&body);
        if indexed < docs.len() {
            warn!("{} of {} transcript documents were rejected", docs.len() - indexed, docs.len());
        }
        Ok(indexed)
    }

    async fn refresh(&self) -> Result<()> {
        let response = self.client.post(self.url("/_refresh")?).send().await?;
        check_status(response, "refresh").await?;
        Ok(())
    }
}
