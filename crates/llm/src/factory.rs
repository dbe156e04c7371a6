//! LLM provider factory.
//!
//! Resolves a provider name from configuration into a concrete client once,
//! at startup. Call sites only ever see `Arc<dyn LlmClient>`.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use cairn_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("gemini", "openai", "ollama")
/// * `endpoint` - Optional custom base URL
/// * `api_key` - API key for hosted providers
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a hosted
/// provider has no API key.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown LLM provider: {}", provider)))?;

    let base_url = endpoint.unwrap_or(provider_type.default_endpoint());

    let api_key = match (provider_type.requires_api_key(), api_key) {
        (true, None) => {
            return Err(AppError::Config(format!(
                "{} provider requires API key",
                provider_type.as_str()
            )))
        }
        (_, key) => key.unwrap_or_default(),
    };

    tracing::debug!(provider = provider_type.as_str(), base_url, "Creating LLM client");

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Gemini => Arc::new(GeminiClient::with_base_url(base_url, api_key)),
        ProviderType::OpenAI => Arc::new(OpenAiClient::with_base_url(base_url, api_key)),
        ProviderType::Ollama => Arc::new(OllamaClient::with_base_url(base_url)),
    };

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_gemini_client() {
        let client = create_client("gemini", None, Some("key")).unwrap();
        assert_eq!(client.provider_name(), "gemini");
    }

    #[test]
    fn test_gemini_requires_api_key() {
        match create_client("gemini", None, None) {
            Err(err) => assert!(err.to_string().contains("requires API key")),
            Ok(_) => panic!("Expected error for Gemini without API key"),
        }
    }

    #[test]
    fn test_openai_requires_api_key() {
        assert!(create_client("openai", None, None).is_err());
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(err) => assert!(err.to_string().contains("Unknown LLM provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
