//! Embedders
//!
//! The `Embedder` capability turns text into fixed-dimension vectors.
//! The concrete backend is an HTTP call to a local Ollama server; a mock
//! implementation supports offline tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::error::{AppError, AppResult};

/// Default Ollama API endpoint.
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Default embedding model.
const DEFAULT_MODEL: &str = "nomic-embed-text";

/// Request timeout for embedding calls.
const EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// Generates vector embeddings for text.
///
/// The dimension must stay stable across a single index's lifetime; a
/// failure surfaces to the caller and aborts the current file's insertion.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;

    /// Embed a batch of texts. The default is a sequential loop over
    /// single calls; backends with a true batch endpoint may override.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            let embedding = self
                .embed(text)
                .await
                .map_err(|e| AppError::external(format!("failed to embed text {}: {}", i, e)))?;
            embeddings.push(embedding);
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize;

    fn model_id(&self) -> &str;
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

/// Embedder backed by Ollama's `/api/embeddings` endpoint.
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dimensions: usize,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    /// Create an embedder for the given model, falling back to
    /// `nomic-embed-text` (768 dimensions) when empty.
    /// `mxbai-embed-large` is known to produce 1024-dimensional vectors.
    pub fn new(model: &str) -> Self {
        let model = if model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model.to_string()
        };

        let dimensions = match model.as_str() {
            "mxbai-embed-large" => 1024,
            _ => 768,
        };

        let client = reqwest::Client::builder()
            .timeout(EMBED_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            base_url: OLLAMA_DEFAULT_URL.to_string(),
            model,
            dimensions,
            client,
        }
    }

    /// Override the server base URL (e.g. a remote Ollama host).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let request = OllamaEmbedRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AppError::external(format!(
                        "cannot connect to Ollama at {}: is the server running?",
                        self.base_url
                    ))
                } else {
                    AppError::external(format!("ollama request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::external(format!(
                "ollama returned status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let result: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::parse(format!("failed to decode embedding response: {}", e)))?;

        if result.embedding.is_empty() {
            return Err(AppError::external("empty embedding returned"));
        }

        Ok(result.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Deterministic embedder for tests: returns zero vectors.
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, _text: &str) -> AppResult<Vec<f32>> {
        Ok(vec![0.0; self.dimensions])
    }

    fn dimension(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}
