//! Gemini embedding provider.
//!
//! Uses `models/{model}:batchEmbedContents`, which accepts at most 99 texts
//! per request in practice. Larger inputs are sub-batched by the trait.

use super::{http_client, status_error};
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use cairn_core::{AppError, AppResult};
use cairn_llm::providers::gemini::qualified_model;
use cairn_llm::ProviderType;
use serde::{Deserialize, Serialize};

/// Largest batch accepted by `batchEmbedContents`.
pub const GEMINI_MAX_BATCH: usize = 99;

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Hosted Gemini embeddings.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    /// Qualified model name ("models/text-embedding-004")
    model: String,
    dimensions: usize,
}

impl GeminiProvider {
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> AppResult<Self> {
        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| ProviderType::Gemini.default_endpoint().to_string());

        Ok(Self {
            client: http_client("Gemini")?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: qualified_model(&config.model),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_batch_size(&self) -> usize {
        GEMINI_MAX_BATCH
    }

    async fn embed_request(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}/v1beta/{}:batchEmbedContents", self.base_url, self.model);

        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.model,
                    content: Content {
                        parts: vec![Part { text: text.as_str() }],
                    },
                })
                .collect(),
        };

        tracing::debug!(batch = texts.len(), model = %self.model, "Sending embedding request to Gemini");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to send request to Gemini: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error("Gemini", response).await);
        }

        let parsed: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse Gemini response: {}", e)))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(AppError::Provider(format!(
                "Gemini returned {} embeddings for {} texts",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn config(endpoint: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "gemini".to_string(),
            model: "text-embedding-004".to_string(),
            dimensions: 2,
            endpoint: Some(endpoint.to_string()),
        }
    }

    /// Answers each request with one vector per text, `[n, 0.5]` for text "n".
    fn echo_numbers(req: &Request) -> ResponseTemplate {
        let body: serde_json::Value = req.body_json().unwrap();
        let embeddings: Vec<serde_json::Value> = body["requests"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| {
                let text = r["content"]["parts"][0]["text"].as_str().unwrap();
                serde_json::json!({"values": [text.parse::<f32>().unwrap(), 0.5]})
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "embeddings": embeddings }))
    }

    #[tokio::test]
    async fn test_large_batch_is_split_and_ordered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/text-embedding-004:batchEmbedContents"))
            .and(query_param("key", "secret"))
            .respond_with(echo_numbers)
            .expect(2)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(&config(&server.uri()), "secret").unwrap();
        let texts: Vec<String> = (0..150).map(|i| i.to_string()).collect();
        let vectors = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors.len(), 150);
        for (i, v) in vectors.iter().enumerate() {
            assert_eq!(v[0], i as f32);
        }

        let requests = server.received_requests().await.unwrap();
        let sizes: Vec<usize> = requests
            .iter()
            .map(|r| {
                let body: serde_json::Value = r.body_json().unwrap();
                body["requests"].as_array().unwrap().len()
            })
            .collect();
        assert_eq!(sizes, vec![99, 51]);

        let first: serde_json::Value = requests[0].body_json().unwrap();
        assert_eq!(first["requests"][0]["model"], "models/text-embedding-004");
    }

    #[tokio::test]
    async fn test_count_mismatch_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [{"values": [0.1, 0.2]}]
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(&config(&server.uri()), "secret").unwrap();
        let err = provider
            .embed_batch(&["uno".to_string(), "dos".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Provider(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(&config(&server.uri()), "secret").unwrap();
        let err = provider.embed("Revolución de Mayo").await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }
}
