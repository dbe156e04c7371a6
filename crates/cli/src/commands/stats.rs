//! Stats command handler.
//!
//! Describes the index snapshot without loading its vectors.

use cairn_core::config::AppConfig;
use cairn_knowledge::IndexSnapshot;
use clap::Args;
use std::collections::BTreeMap;

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing stats command");

        let passages = IndexSnapshot::read_passages(&config.data_dir)?;
        let manifest = IndexSnapshot::read_manifest(&config.data_dir)?;

        let mut per_source: BTreeMap<&str, usize> = BTreeMap::new();
        for passage in &passages {
            *per_source.entry(passage.source.as_str()).or_default() += 1;
        }
        let total_chars: usize = passages.iter().map(|p| p.text.chars().count()).sum();

        if self.json {
            let output = serde_json::json!({
                "dataDir": config.data_dir,
                "passages": passages.len(),
                "sources": per_source,
                "totalChars": total_chars,
                "manifest": manifest,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Index: {}", config.data_dir.display());
        println!("  Passages: {}", passages.len());
        println!("  Characters: {}", total_chars);
        match &manifest {
            Some(m) => {
                println!("  Embedding model: {} ({} dimensions)", m.embedding_model, m.dimensions);
                println!("  Built at: {}", m.built_at.to_rfc3339());
            }
            None => println!("  Embedding model: unknown (no manifest)"),
        }
        println!("  Sources: {}", per_source.len());
        for (source, count) in &per_source {
            println!("    {} ({} passages)", source, count);
        }

        Ok(())
    }
}
