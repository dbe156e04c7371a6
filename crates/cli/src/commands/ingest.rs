//! Ingest command handler.
//!
//! Builds the index snapshot from the configured (or given) sources.

use anyhow::Context;
use cairn_core::config::AppConfig;
use cairn_knowledge::{ingest, IngestOptions, ProgressEvent, ProgressReporter};
use clap::Args;
use std::sync::Arc;

/// Build the index from sources
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// URL or local path to ingest (repeatable; defaults to the configured sources)
    #[arg(long = "source", value_name = "URL_OR_PATH")]
    pub sources: Vec<String>,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Hide per-phase progress lines
    #[arg(short, long)]
    pub quiet: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing ingest command");
        config.validate_embedding()?;

        let sources = if self.sources.is_empty() {
            config.sources.clone()
        } else {
            self.sources.clone()
        };

        let embedder = super::build_embedder(config)?;

        let progress = if self.quiet {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event: ProgressEvent| eprintln!("{}", event.format_simple())))
        };

        let report = ingest(
            &sources,
            embedder.as_ref(),
            &config.data_dir,
            IngestOptions::from(&config.rag),
            &progress,
        )
        .await
        .with_context(|| format!("Failed to write index to {:?}", config.data_dir))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!(
                "Indexed {} passages from {} sources in {:.2}s (model {})",
                report.indexed,
                report.sources.len().saturating_sub(report.skipped_sources.len()),
                report.duration_secs,
                report.embedding_model
            );
            for source in &report.skipped_sources {
                println!("  skipped source: {}", source);
            }
            if report.skipped_batches > 0 {
                println!("  skipped embedding batches: {}", report.skipped_batches);
            }
        }

        Ok(())
    }
}
