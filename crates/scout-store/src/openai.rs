//! OpenAI-compatible embeddings client.
//!
//! Talks to any endpoint implementing `POST {base_url}/embeddings`. The
//! client never retries: a failed or slow call surfaces immediately as
//! [`Error::DependencyUnavailable`] and the caller decides what to do.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use scout_core::{Dependency, Error, Result};

use crate::embedding::EmbeddingProvider;

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Embedding provider backed by an OpenAI-compatible HTTP API.
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimension: usize,
    request_dimensions: bool,
}

impl OpenAiEmbeddingProvider {
    /// Build a client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Bearer token sent with every request
    /// * `base_url` - API root, e.g. `https://api.openai.com/v1`
    /// * `model` - Model name, e.g. `text-embedding-3-small`
    /// * `dimension` - Expected vector length
    /// * `timeout` - Per-request timeout
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::config("missing embedding API key"));
        }
        if dimension == 0 {
            return Err(Error::config("embedding dimension must be positive"));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| Error::config(format!("invalid embedding API key: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::config(format!("failed to build embedding HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            dimension,
            request_dimensions: false,
        })
    }

    /// Ask the endpoint to shorten vectors to `dimension` (supported by the
    /// `text-embedding-3-*` family).
    pub fn with_requested_dimensions(mut self) -> Self {
        self.request_dimensions = true;
        self
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The full embeddings endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn unavailable(reason: impl Into<String>) -> Error {
        Error::dependency(Dependency::Embedding, reason)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text]).await?;
        batch
            .pop()
            .ok_or_else(|| Self::unavailable("empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.request_dimensions.then_some(self.dimension),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::unavailable(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Self::unavailable(format!("HTTP {status}: {body}")));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Self::unavailable(format!("invalid response body: {e}")))?;

        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != texts.len() {
            return Err(Self::unavailable(format!(
                "returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        let mut out = Vec::with_capacity(parsed.data.len());
        for (expected, entry) in parsed.data.into_iter().enumerate() {
            if entry.index != expected {
                return Err(Self::unavailable(format!(
                    "missing embedding for input {expected}"
                )));
            }
            if entry.embedding.len() != self.dimension {
                return Err(Self::unavailable(format!(
                    "expected dimension {}, got {}",
                    self.dimension,
                    entry.embedding.len()
                )));
            }
            out.push(entry.embedding);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "openai"
    }
}
