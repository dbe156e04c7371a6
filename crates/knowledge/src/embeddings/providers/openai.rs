//! OpenAI embedding provider (`/v1/embeddings`).

use super::{http_client, status_error};
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use cairn_core::{AppError, AppResult};
use cairn_llm::ProviderType;
use serde::{Deserialize, Serialize};

/// Maximum inputs per `/v1/embeddings` request.
pub const OPENAI_MAX_BATCH: usize = 2048;

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Hosted OpenAI embeddings.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> AppResult<Self> {
        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| ProviderType::OpenAI.default_endpoint().to_string());

        Ok(Self {
            client: http_client("OpenAI")?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_batch_size(&self) -> usize {
        OPENAI_MAX_BATCH
    }

    async fn embed_request(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url);

        tracing::debug!(batch = texts.len(), model = %self.model, "Sending embedding request to OpenAI");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to send request to OpenAI: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error("OpenAI", response).await);
        }

        let mut parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse OpenAI response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(AppError::Provider(format!(
                "OpenAI returned {} embeddings for {} texts",
                parsed.data.len(),
                texts.len()
            )));
        }

        // The API does not promise response order
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}
