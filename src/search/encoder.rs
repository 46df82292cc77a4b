//! HTTP text encoder client.

use super::TextEncoder;
use crate::error::{FramefindError, Result};
use crate::http::create_client_with_timeout;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

#[derive(Serialize)]
struct EncodeRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EncodeResponse {
    embedding: Vec<f32>,
}

/// Encodes queries by posting `{"text": ...}` to an encoder service that
/// answers with `{"embedding": [...]}`.
pub struct HttpTextEncoder {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTextEncoder {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            endpoint: Url::parse(endpoint)?,
        })
    }
}

#[async_trait]
impl TextEncoder for HttpTextEncoder {
    #[instrument(skip(self, text))]
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&EncodeRequest { text })
            .send()
            .await
            .map_err(|e| FramefindError::Encoder(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FramefindError::Encoder(format!("{}: {}", status, body)));
        }

        let parsed: EncodeResponse = response.json().await?;
        if parsed.embedding.is_empty() {
            return Err(FramefindError::Encoder("Empty embedding response".to_string()));
        }

        debug!("Encoded query into {} dimensions", parsed.embedding.len());
        Ok(parsed.embedding)
    }
}
