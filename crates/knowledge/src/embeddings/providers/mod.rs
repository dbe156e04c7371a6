//! Concrete embedding providers.

pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod trigram;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use trigram::TrigramProvider;

use std::time::Duration;

/// Request timeout shared by the HTTP-backed providers.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client used by a provider.
pub(crate) fn http_client(provider: &str) -> cairn_core::AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| {
            cairn_core::AppError::Provider(format!(
                "Failed to create HTTP client for {}: {}",
                provider, e
            ))
        })
}

/// Turn a non-success response into a provider error carrying status and body.
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> cairn_core::AppError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    cairn_core::AppError::Provider(format!("{} API error ({}): {}", provider, status, error_text))
}
