//! Embedding providers and batch orchestration.
//!
//! The provider is injected wherever embeddings are needed; its lifecycle
//! is owned by the caller, so tests substitute a deterministic stub
//! instead of mocking a hidden client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::engine::cancel::CancelToken;

/// Error type for embedding operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),

    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("provider returned {got} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

/// An external embedding provider. Treated as an opaque remote call;
/// correctness of the vectors cannot be verified locally.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier, used to fingerprint the dataset.
    fn model(&self) -> &str;

    /// Output dimensionality the provider is configured for.
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts. Output order matches input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

/// SHA256 fingerprint of a model identifier. Stored with the dataset so
/// a model change invalidates persisted vectors instead of silently
/// mixing vector spaces.
pub fn model_fingerprint(model: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.finalize().into()
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::InvalidConfig("empty API key".to_string()));
        }
        if model.trim().is_empty() {
            return Err(ProviderError::InvalidConfig("empty model name".to_string()));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| ProviderError::InvalidConfig("invalid API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: Some(self.dimensions),
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        parsed.data.sort_by_key(|entry| entry.index);

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Batch orchestration over an [`EmbeddingProvider`] with cooperative
/// cancellation.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Fingerprint of the provider's model identity.
    pub fn model_id(&self) -> [u8; 32] {
        model_fingerprint(self.provider.model())
    }

    /// Embed a batch of texts, order-preserving.
    ///
    /// Returns `None` when the token was already cancelled: no network
    /// work is done in that case. A provider response with the wrong
    /// number of vectors fails the whole batch.
    pub async fn embed(
        &self,
        texts: &[String],
        token: &CancelToken,
    ) -> Result<Option<Vec<Vec<f32>>>, ProviderError> {
        if token.is_cancelled() {
            return Ok(None);
        }
        if texts.is_empty() {
            return Ok(Some(vec![]));
        }

        let vectors = self.provider.embed_batch(texts).await?;
        if vectors.len() != texts.len() {
            return Err(ProviderError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }

        Ok(Some(vectors))
    }
}
