//! Cairn CLI
//!
//! Main entry point for the cairn command-line tool: builds the index from
//! sources and answers questions with cited passages.

mod commands;

use anyhow::Context;
use cairn_core::{config::AppConfig, logging};
use clap::{Parser, Subcommand};
use commands::{AskCommand, IngestCommand, SearchCommand, StatsCommand};
use std::path::PathBuf;

/// Cairn - answers questions from your documents, with citations
#[derive(Parser, Debug)]
#[command(name = "cairn")]
#[command(about = "Answers questions from your documents, with citations", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: ./cairn.yaml if present)
    #[arg(short, long, global = true, env = "CAIRN_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the index snapshot
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Embedding provider (gemini, openai, ollama, trigram)
    #[arg(long, global = true)]
    embedding_provider: Option<String>,

    /// Generation provider (gemini, openai, ollama)
    #[arg(long, global = true)]
    llm_provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the index from sources
    Ingest(IngestCommand),

    /// Answer a question with cited passages
    Ask(AskCommand),

    /// Show the passages nearest to a query
    Search(SearchCommand),

    /// Show index statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // --config wins over CAIRN_CONFIG; everything else comes from the environment
    let config_file = cli.config.clone();
    let config = AppConfig::load_with(|key| match (key, &config_file) {
        ("CAIRN_CONFIG", Some(path)) => Some(path.display().to_string()),
        _ => std::env::var(key).ok(),
    })
    .context("Failed to load configuration")?;

    let config = config.with_overrides(
        cli.data_dir,
        cli.embedding_provider,
        cli.llm_provider,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Cairn CLI starting");
    tracing::debug!("Config file: {:?}", config.config_file);
    tracing::debug!("Data dir: {:?}", config.data_dir);
    tracing::debug!(
        "Embedding: {}:{}, generation: {}:{}",
        config.embedding.provider,
        config.embedding.model,
        config.generation.provider,
        config.generation.model
    );

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Search(_) => "search",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_flags() {
        let cli = Cli::parse_from([
            "cairn",
            "--embedding-provider",
            "trigram",
            "ask",
            "¿Cuándo fue la Revolución de Mayo?",
            "-k",
            "4",
            "--trace",
        ]);

        assert_eq!(cli.embedding_provider.as_deref(), Some("trigram"));
        match cli.command {
            Commands::Ask(cmd) => {
                assert_eq!(cmd.question, "¿Cuándo fue la Revolución de Mayo?");
                assert_eq!(cmd.top_k, Some(4));
                assert!(cmd.trace);
                assert!(!cmd.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_zero_top_k_is_rejected() {
        for command in ["ask", "search"] {
            let err = Cli::try_parse_from(["cairn", command, "Belgrano", "-k", "0"]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
        assert!(Cli::try_parse_from(["cairn", "search", "Belgrano", "--top-k", "1"]).is_ok());
    }

    #[test]
    fn test_ingest_repeated_sources_and_global_flag_after_subcommand() {
        let cli = Cli::parse_from([
            "cairn",
            "ingest",
            "--source",
            "https://es.wikipedia.org/wiki/Argentina",
            "--source",
            "./apuntes",
            "--data-dir",
            "/tmp/idx",
        ]);

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/idx")));
        match cli.command {
            Commands::Ingest(cmd) => assert_eq!(cmd.sources.len(), 2),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
