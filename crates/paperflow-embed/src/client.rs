//! OpenAI-compatible embeddings client

use paperflow_core::{HttpError, ItemError, error_for_status, http_client, retry_with_backoff};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Requested output size (models that support shortening)
    pub dimensions: Option<u32>,
    /// Texts per request
    pub batch_size: usize,
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
            batch_size: 64,
            max_retries: 3,
        }
    }
}

/// Turns texts into vectors, one per text, in input order.
#[allow(async_fn_in_trait)]
pub trait Embedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ItemError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

pub struct EmbeddingClient {
    config: EmbeddingConfig,
    url: String,
}

impl EmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Self {
        let url = format!("{}/embeddings", config.base_url.trim_end_matches('/'));
        Self { config, url }
    }

    async fn embed_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ItemError> {
        let body = EmbeddingRequest {
            model: &self.config.model,
            input: texts,
            dimensions: self.config.dimensions,
        };
        let mut req = http_client().post(&self.url).json(&body);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| HttpError::from_reqwest(&e))?;
        let text = error_for_status(resp)
            .await?
            .text()
            .await
            .map_err(|e| HttpError::from_reqwest(&e))?;

        let mut parsed: EmbeddingResponse = serde_json::from_str(&text)
            .map_err(|e| ItemError::parse(format!("embedding response: {e}")))?;
        if parsed.data.len() != texts.len() {
            return Err(ItemError::parse(format!(
                "asked for {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Embedder for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ItemError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let part = retry_with_backoff("embeddings", self.config.max_retries, || {
                self.embed_once(batch)
            })
            .await?;
            vectors.extend(part);
        }
        Ok(vectors)
    }
}
