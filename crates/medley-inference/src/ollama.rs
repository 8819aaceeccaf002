//! Ollama embedding backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use medley_core::{EmbeddingProvider, Error, Result};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default embedding model.
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// Default embedding dimension for nomic-embed-text.
pub const DEFAULT_DIMENSION: usize = 768;

/// Timeout for embedding requests (seconds).
pub const EMBED_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embedding backend talking to a local or remote Ollama instance.
pub struct OllamaEmbeddingBackend {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
    timeout_secs: u64,
}

impl OllamaEmbeddingBackend {
    /// Create a backend with default settings.
    pub fn new() -> Self {
        Self::with_config(
            DEFAULT_OLLAMA_URL.to_string(),
            DEFAULT_EMBED_MODEL.to_string(),
            DEFAULT_DIMENSION,
        )
    }

    /// Create a backend with custom endpoint, model, and dimension.
    pub fn with_config(base_url: String, model: String, dimension: usize) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            dimension,
            timeout_secs: EMBED_TIMEOUT_SECS,
        }
    }

    /// Override the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Default for OllamaEmbeddingBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("cannot embed empty text".into()));
        }

        let started = Instant::now();
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(model = %self.model, status = %status, "Embedding request rejected");
            return Err(Error::Provider(format!(
                "embedding request returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("invalid embedding response: {}", e)))?;

        if parsed.embedding.len() != self.dimension {
            return Err(Error::Provider(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                parsed.embedding.len()
            )));
        }

        debug!(
            model = %self.model,
            duration_ms = started.elapsed().as_millis() as u64,
            "Embedding generated"
        );
        Ok(parsed.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
