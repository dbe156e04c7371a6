//! Search command handler.
//!
//! Runs the retriever alone, without expansion or generation.

use anyhow::Context;
use cairn_core::config::AppConfig;
use clap::Args;

/// Show the passages nearest to a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of passages to return (defaults to the configured top_k)
    #[arg(short = 'k', long, value_parser = super::parse_top_k)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing search command");
        config.validate_embedding()?;

        let retriever = super::load_retriever(config)?;
        let k = self.top_k.unwrap_or(config.rag.top_k);

        let results = retriever
            .search(&self.query, k)
            .await
            .context("Search failed")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&results)?);
            return Ok(());
        }

        if results.is_empty() {
            println!("No passages indexed.");
            return Ok(());
        }

        for (rank, result) in results.iter().enumerate() {
            println!("{:>2}. {:.3}  {}  {}", rank + 1, result.score, result.id, result.source);
            println!("    {}", super::preview(&result.text, 160));
        }

        Ok(())
    }
}
