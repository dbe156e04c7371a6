//! Command handlers for the cairn CLI.
//!
//! Providers and the retriever are built here once per process and handed to
//! the library by reference.

pub mod ask;
pub mod ingest;
pub mod search;
pub mod stats;

pub use ask::AskCommand;
pub use ingest::IngestCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;

use anyhow::Context;
use cairn_core::config::AppConfig;
use cairn_knowledge::{create_provider, EmbeddingConfig, EmbeddingProvider, Retriever};
use std::sync::Arc;

/// Embedding provider selected by configuration.
pub(crate) fn build_embedder(config: &AppConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let embedding = EmbeddingConfig::from(config);
    let api_key = config.resolve_api_key(&embedding.provider);
    create_provider(&embedding, api_key)
        .with_context(|| format!("Failed to create embedding provider '{}'", embedding.provider))
}

/// Load the snapshot in `data_dir` behind the configured embedder.
pub(crate) fn load_retriever(config: &AppConfig) -> anyhow::Result<Arc<Retriever>> {
    let embedder = build_embedder(config)?;
    let retriever = Retriever::load(&config.data_dir, embedder)
        .with_context(|| format!("Failed to load index from {:?}", config.data_dir))?;
    Ok(Arc::new(retriever))
}

/// Value parser for `--top-k`: a positive integer.
pub(crate) fn parse_top_k(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(k) => Ok(k),
        Err(e) => Err(e.to_string()),
    }
}

/// First `max` characters of `text` on one line, with an ellipsis when cut.
pub(crate) fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{}…", cut.trim_end())
    }
}
