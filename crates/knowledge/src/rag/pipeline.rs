//! Question answering orchestration: expand, retrieve, synthesize.

use crate::rag::expand::QueryExpander;
use crate::rag::synthesize::{AnswerSynthesizer, TECHNICAL_FAILURE_ANSWER};
use crate::rag::types::{PipelineTrace, Stage};
use crate::retriever::Retriever;
use crate::types::Answer;
use std::sync::Arc;

/// Runs the three stages strictly in sequence for one question.
///
/// Holds no per-request state; one instance serves every question for the
/// lifetime of the process.
pub struct RagPipeline {
    expander: QueryExpander,
    retriever: Arc<Retriever>,
    synthesizer: AnswerSynthesizer,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        expander: QueryExpander,
        retriever: Arc<Retriever>,
        synthesizer: AnswerSynthesizer,
        top_k: usize,
    ) -> Self {
        Self {
            expander,
            retriever,
            synthesizer,
            top_k,
        }
    }

    /// Answer `question`. Always returns a well-formed answer.
    pub async fn answer(&self, question: &str) -> Answer {
        self.run(question).await.answer.into_value()
    }

    /// Answer `question` and report what each stage did.
    ///
    /// The expanded query drives retrieval only; the synthesizer sees the
    /// question exactly as asked.
    pub async fn run(&self, question: &str) -> PipelineTrace {
        tracing::info!("Answering: {}", question);

        let expanded = self.expander.expand(question).await;

        let passages = match self.retriever.search(expanded.value(), self.top_k).await {
            Ok(passages) => passages,
            Err(e) => {
                tracing::warn!("Retrieval failed: {}", e);
                return PipelineTrace {
                    question: question.to_string(),
                    expanded,
                    retrieved: 0,
                    answer: Stage::degraded(Answer::uncited(TECHNICAL_FAILURE_ANSWER), e.to_string()),
                };
            }
        };

        tracing::info!("Retrieved {} passages for '{}'", passages.len(), expanded.value());

        let answer = self.synthesizer.synthesize(question, &passages).await;

        PipelineTrace {
            question: question.to_string(),
            expanded,
            retrieved: passages.len(),
            answer,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}
