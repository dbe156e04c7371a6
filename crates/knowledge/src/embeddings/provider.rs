//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{GeminiProvider, OllamaProvider, OpenAiProvider, TrigramProvider};
use cairn_core::config::EMBEDDING_PROVIDERS;
use cairn_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// `embed_batch(texts)[i]` always corresponds to `texts[i]`. Implementations
/// only provide [`embed_request`](EmbeddingProvider::embed_request), a single
/// upstream call of at most [`max_batch_size`](EmbeddingProvider::max_batch_size)
/// texts; sub-batching is shared. Providers never retry.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "gemini", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Largest number of texts accepted by one upstream call.
    fn max_batch_size(&self) -> usize;

    /// One upstream call for `texts.len() <= max_batch_size()` texts.
    async fn embed_request(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embeddings for any number of texts, sub-batching as needed.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let limit = self.max_batch_size().max(1);
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(limit) {
            let embedded = self.embed_request(batch).await?;
            if embedded.len() != batch.len() {
                return Err(AppError::Provider(format!(
                    "{} returned {} embeddings for {} texts",
                    self.provider_name(),
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
        }

        tracing::debug!(
            "Embedded {} texts with {} in {} request(s)",
            texts.len(),
            self.model_id(),
            texts.len().div_ceil(limit)
        );

        Ok(vectors)
    }

    /// Generate embedding for a single text (queries).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Provider("No embedding returned".to_string()))
    }

    /// `provider:model`, recorded in the index manifest.
    fn model_id(&self) -> String {
        format!("{}:{}", self.provider_name(), self.model_name())
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    tracing::debug!(
        "Creating embedding provider: provider={}, model={}, dimensions={}",
        config.provider,
        config.model,
        config.dimensions
    );

    let require_key = || {
        api_key.map(str::to_string).ok_or_else(|| {
            AppError::Config(format!(
                "API key required for embedding provider '{}'. Set {}_API_KEY.",
                config.provider,
                config.provider.to_uppercase()
            ))
        })
    };

    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(config, require_key()?)?)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(config, require_key()?)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        "trigram" => Ok(Arc::new(TrigramProvider::new(config.dimensions))),
        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: {}",
            config.provider,
            EMBEDDING_PROVIDERS.join(", ")
        ))),
    }
}
