//! Grounded answer synthesis.

use crate::rag::prompt::PromptTemplates;
use crate::rag::types::Stage;
use crate::types::{Answer, Citation, RetrievalResult};
use cairn_llm::{LlmClient, LlmRequest};
use std::sync::Arc;

/// Answer when retrieval found nothing.
pub const NO_MATERIAL_ANSWER: &str =
    "Tras revisar los archivos, no se encontró material pertinente para elaborar una respuesta.";

/// Answer when the retrieved text is too short to ground anything.
pub const FRAGMENTARY_ANSWER: &str = "La información encontrada en los documentos es demasiado fragmentaria para construir una respuesta académica sólida.";

/// Answer when the language model could not be consulted.
pub const TECHNICAL_FAILURE_ANSWER: &str =
    "Hubo una dificultad técnica al consultar los archivos. Por favor, intente nuevamente.";

/// Retrieved text shorter than this (in characters) is not worth a model call.
pub const MIN_RETRIEVED_CHARS: usize = 200;

/// Separator appended after every context block.
const BLOCK_SEPARATOR: &str = "\n\n";

/// Builds bounded context, prompts the model and maps citations.
pub struct AnswerSynthesizer {
    client: Arc<dyn LlmClient>,
    model: String,
    max_context_chars: usize,
    prompts: PromptTemplates,
}

impl AnswerSynthesizer {
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        max_context_chars: usize,
        prompts: PromptTemplates,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            max_context_chars,
            prompts,
        }
    }

    /// Answer `question` from `passages` (score-descending).
    ///
    /// Guard clauses answer without a model call. A failed call degrades to
    /// [`TECHNICAL_FAILURE_ANSWER`] with no citations.
    pub async fn synthesize(&self, question: &str, passages: &[RetrievalResult]) -> Stage<Answer> {
        if passages.is_empty() {
            tracing::info!("No passages retrieved; answering without the model");
            return Stage::Complete(Answer::uncited(NO_MATERIAL_ANSWER));
        }

        let total_chars: usize = passages.iter().map(|p| p.text.chars().count()).sum();
        if total_chars < MIN_RETRIEVED_CHARS {
            tracing::info!(
                "Retrieved text too short ({} chars); answering without the model",
                total_chars
            );
            return Stage::Complete(Answer::uncited(FRAGMENTARY_ANSWER));
        }

        let context = build_context(passages, self.max_context_chars);
        let prompt = match self.prompts.grounding(question, &context) {
            Ok(prompt) => prompt,
            Err(e) => return technical_failure(e.to_string()),
        };

        tracing::debug!(prompt = %prompt, "Grounding prompt");

        match self.client.complete(&LlmRequest::new(prompt, &self.model)).await {
            Ok(response) => {
                tracing::info!(
                    "Generated answer with {} ({} tokens)",
                    response.model,
                    response.usage.total_tokens
                );
                Stage::Complete(Answer {
                    text: response.content,
                    citations: format_citations(passages),
                })
            }
            Err(e) => technical_failure(e.to_string()),
        }
    }
}

fn technical_failure(reason: String) -> Stage<Answer> {
    tracing::warn!("Answer generation failed: {}", reason);
    Stage::degraded(Answer::uncited(TECHNICAL_FAILURE_ANSWER), reason)
}

/// Assemble indexed context blocks within a character budget.
///
/// Block `i` is `"[i] <trimmed text>"` followed by a blank line. Blocks are
/// appended while `current + block + separator < max_chars`; the first block
/// that does not fit ends the context.
pub fn build_context(passages: &[RetrievalResult], max_chars: usize) -> String {
    let separator_len = BLOCK_SEPARATOR.chars().count();
    let mut context = String::new();
    let mut context_len = 0usize;

    for (i, passage) in passages.iter().enumerate() {
        let piece = format!("[{}] {}", i, passage.text.trim());
        let piece_len = piece.chars().count();

        if context_len + piece_len + separator_len >= max_chars {
            tracing::debug!(
                "Context budget reached after {} of {} passages",
                i,
                passages.len()
            );
            break;
        }

        context.push_str(&piece);
        context.push_str(BLOCK_SEPARATOR);
        context_len += piece_len + separator_len;
    }

    context
}

/// One citation per retrieved passage, in retrieval order.
pub fn format_citations(passages: &[RetrievalResult]) -> Vec<Citation> {
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| Citation {
            id: if p.id.is_empty() {
                format!("doc-{}", i)
            } else {
                p.id.clone()
            },
            source: p.source.clone(),
        })
        .collect()
}
