//! LLM integration crate for Cairn.
//!
//! Provides a provider-agnostic abstraction over language models used for
//! query expansion and answer synthesis.
//!
//! # Providers
//! - **Gemini**: Google Generative Language API (default)
//! - **OpenAI**: chat completions API
//! - **Ollama**: local LLM runtime
//!
//! # Example
//! ```no_run
//! use cairn_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GeminiClient, OllamaClient, OpenAiClient};
pub use types::ProviderType;
