//! Query expansion.
//!
//! Rewrites a question into a search-oriented query with one language-model
//! call. Any failure falls back to the question itself.

use crate::rag::prompt::PromptTemplates;
use crate::rag::types::Stage;
use cairn_llm::{LlmClient, LlmRequest};
use std::sync::Arc;

/// Marks the suggested query in list-style model output.
const OPTION_MARKER: char = '*';

/// Rewrites questions for retrieval.
pub struct QueryExpander {
    client: Arc<dyn LlmClient>,
    model: String,
    prompts: PromptTemplates,
}

impl QueryExpander {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, prompts: PromptTemplates) -> Self {
        Self {
            client,
            model: model.into(),
            prompts,
        }
    }

    /// Expand `question`; `Degraded` carries the original question.
    pub async fn expand(&self, question: &str) -> Stage<String> {
        let prompt = match self.prompts.expansion(question) {
            Ok(prompt) => prompt,
            Err(e) => return self.fallback(question, e.to_string()),
        };

        let request = LlmRequest::new(prompt, &self.model);
        let raw = match self.client.complete(&request).await {
            Ok(response) => response.content,
            Err(e) => return self.fallback(question, e.to_string()),
        };

        tracing::debug!(raw = %raw, "Raw expansion output");

        let expanded = clean_expanded_query(&raw);
        if expanded.is_empty() {
            return self.fallback(question, "model returned an empty query".to_string());
        }

        tracing::info!("Expanded '{}' -> '{}'", question, expanded);
        Stage::Complete(expanded)
    }

    fn fallback(&self, question: &str, reason: String) -> Stage<String> {
        tracing::warn!("Query expansion failed, using the original question: {}", reason);
        Stage::degraded(question.to_string(), reason)
    }
}

/// Extract the rewritten query from raw model output.
///
/// The first line containing `*` wins and contributes the text after its
/// first marker; otherwise the whole output is used. Double quotes are
/// removed and surrounding whitespace and single quotes stripped.
pub fn clean_expanded_query(raw: &str) -> String {
    let candidate = raw
        .lines()
        .find(|line| line.contains(OPTION_MARKER))
        .and_then(|line| line.split_once(OPTION_MARKER))
        .map_or(raw, |(_, after)| after);

    candidate
        .replace('"', "")
        .trim()
        .trim_matches('\'')
        .trim()
        .to_string()
}
