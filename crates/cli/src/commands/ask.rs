//! Ask command handler.
//!
//! Runs the full answering pipeline for one question.

use anyhow::Context;
use cairn_core::config::AppConfig;
use cairn_knowledge::rag::{AnswerSynthesizer, PromptTemplates, QueryExpander};
use cairn_knowledge::{RagPipeline, Stage};
use cairn_llm::create_client;
use clap::Args;

/// Answer a question with cited passages
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to answer
    pub question: String,

    /// Number of passages to retrieve (defaults to the configured top_k)
    #[arg(short = 'k', long, value_parser = super::parse_top_k)]
    pub top_k: Option<usize>,

    /// Output as JSON (`{answer, citations}`)
    #[arg(long)]
    pub json: bool,

    /// Also show the expanded query and stage fallbacks
    #[arg(long)]
    pub trace: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing ask command");
        config.validate()?;

        let question = self.question.trim();
        if question.is_empty() {
            anyhow::bail!("The question is empty");
        }

        let pipeline = self.build_pipeline(config)?;
        let trace = pipeline.run(question).await;

        if self.json {
            let output = if self.trace {
                serde_json::to_string_pretty(&trace)?
            } else {
                serde_json::to_string_pretty(trace.answer.value())?
            };
            println!("{}", output);
            return Ok(());
        }

        if self.trace {
            match &trace.expanded {
                Stage::Complete(query) => eprintln!("Expanded query: {}", query),
                Stage::Degraded { value, reason } => {
                    eprintln!("Expanded query: {} (fallback: {})", value, reason)
                }
            }
            eprintln!("Retrieved passages: {}", trace.retrieved);
            if let Some(reason) = trace.answer.reason() {
                eprintln!("Answer fallback: {}", reason);
            }
        }

        let answer = trace.answer.value();
        println!("{}", answer.text);

        if !answer.citations.is_empty() {
            println!();
            println!("Sources:");
            for (i, citation) in answer.citations.iter().enumerate() {
                println!("[{}] {} ({})", i, citation.source, citation.id);
            }
        }

        Ok(())
    }

    fn build_pipeline(&self, config: &AppConfig) -> anyhow::Result<RagPipeline> {
        let retriever = super::load_retriever(config)?;

        let generation = &config.generation;
        let client = create_client(
            &generation.provider,
            generation.endpoint.as_deref(),
            config.resolve_api_key(&generation.provider),
        )
        .with_context(|| format!("Failed to create LLM client '{}'", generation.provider))?;

        let prompts = PromptTemplates::new()?;
        let top_k = self.top_k.unwrap_or(config.rag.top_k);

        tracing::debug!(
            "Pipeline: generation={}:{}, embedding={}, top_k={}",
            generation.provider,
            generation.model,
            retriever.embedder().model_id(),
            top_k
        );

        Ok(RagPipeline::new(
            QueryExpander::new(client.clone(), &generation.model, prompts.clone()),
            retriever,
            AnswerSynthesizer::new(client, &generation.model, config.rag.max_context_chars, prompts),
            top_k,
        ))
    }
}
