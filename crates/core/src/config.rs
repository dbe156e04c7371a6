//! Configuration management for Cairn.
//!
//! Configuration is resolved once at startup, in increasing precedence:
//! - Built-in defaults
//! - YAML config file (`cairn.yaml` or `CAIRN_CONFIG`)
//! - Environment variables
//! - Command-line flags (`with_overrides`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers the adapter factory knows about.
pub const EMBEDDING_PROVIDERS: [&str; 4] = ["gemini", "openai", "ollama", "trigram"];

/// Generation providers the LLM factory knows about.
pub const GENERATION_PROVIDERS: [&str; 3] = ["gemini", "openai", "ollama"];

/// Corpus used when no source list is configured.
pub const DEFAULT_SOURCES: [&str; 2] = [
    "https://es.wikipedia.org/wiki/Argentina",
    "https://es.wikipedia.org/wiki/Historia_de_la_Argentina",
];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the persisted index snapshot
    pub data_dir: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Embedding provider selection
    pub embedding: EmbeddingSettings,

    /// Generation (language model) provider selection
    pub generation: GenerationSettings,

    /// API key for the Gemini endpoints
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,

    /// API key for the OpenAI endpoints
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Ordered corpus source list (URLs or local paths)
    pub sources: Vec<String>,

    /// Retrieval and chunking parameters
    pub rag: RagSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Active embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider name: "gemini", "openai", "ollama", "trigram"
    pub provider: String,

    /// Provider-specific model identifier
    pub model: String,

    /// Expected vector dimension
    pub dimensions: usize,

    /// Base URL override
    pub endpoint: Option<String>,
}

/// Active generation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Provider name: "gemini", "openai", "ollama"
    pub provider: String,

    /// Provider-specific model identifier
    pub model: String,

    /// Base URL override
    pub endpoint: Option<String>,
}

/// Numeric knobs of the retrieval pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RagSettings {
    /// Passages retrieved per question
    pub top_k: usize,

    /// Character budget of the assembled context
    pub max_context_chars: usize,

    /// Maximum chunk size in characters
    pub chunk_size: usize,

    /// Characters carried over from the previous chunk
    pub chunk_overlap: usize,

    /// Passages per embedding call during ingestion
    pub embed_batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "models/text-embedding-004".to_string(),
            dimensions: 768,
            endpoint: None,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            endpoint: None,
        }
    }
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            max_context_chars: 8000,
            chunk_size: 500,
            chunk_overlap: 100,
            embed_batch_size: 64,
        }
    }
}

/// On-disk YAML layout. Every field is optional and merged over the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    embedding: Option<PartialEmbedding>,
    generation: Option<PartialGeneration>,
    sources: Option<Vec<String>>,
    retrieval: Option<RetrievalSection>,
    chunking: Option<ChunkingSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PartialEmbedding {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PartialGeneration {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RetrievalSection {
    top_k: Option<usize>,
    max_context_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ChunkingSection {
    size: Option<usize>,
    overlap: Option<usize>,
    embed_batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            config_file: None,
            embedding: EmbeddingSettings::default(),
            generation: GenerationSettings::default(),
            gemini_api_key: None,
            openai_api_key: None,
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            rag: RagSettings::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - `CAIRN_CONFIG`, `CAIRN_DATA_DIR`
    /// - `CAIRN_EMBEDDING_PROVIDER`, `CAIRN_EMBEDDING_MODEL`, `CAIRN_EMBEDDING_DIM`, `CAIRN_EMBEDDING_ENDPOINT`
    /// - `CAIRN_LLM_PROVIDER`, `CAIRN_GENERATION_MODEL`, `CAIRN_LLM_ENDPOINT`
    /// - `GEMINI_API_KEY`, `OPENAI_API_KEY`
    /// - `CAIRN_SOURCES` (comma separated)
    /// - `CAIRN_TOP_K`, `CAIRN_MAX_CONTEXT_CHARS`, `CAIRN_CHUNK_SIZE`, `CAIRN_CHUNK_OVERLAP`, `CAIRN_EMBED_BATCH`
    /// - `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use cairn_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index directory: {:?}", config.data_dir);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration using an arbitrary variable lookup.
    pub fn load_with<F>(env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(config_file) = env("CAIRN_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        let config_path = match config.config_file {
            Some(ref cf) => {
                if !cf.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        cf
                    )));
                }
                Some(cf.clone())
            }
            None => {
                let local = PathBuf::from("cairn.yaml");
                local.exists().then_some(local)
            }
        };

        if let Some(path) = config_path {
            config.merge_yaml(&path)?;
            config.config_file = Some(path);
        }

        // Environment variables override YAML config
        if let Some(dir) = env("CAIRN_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(provider) = env("CAIRN_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider.to_lowercase();
        }
        if let Some(model) = env("CAIRN_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Some(dim) = env("CAIRN_EMBEDDING_DIM") {
            config.embedding.dimensions = parse_number("CAIRN_EMBEDDING_DIM", &dim)?;
        }
        if let Some(endpoint) = env("CAIRN_EMBEDDING_ENDPOINT") {
            config.embedding.endpoint = Some(endpoint);
        }
        if let Some(provider) = env("CAIRN_LLM_PROVIDER") {
            config.generation.provider = provider.to_lowercase();
        }
        if let Some(model) = env("CAIRN_GENERATION_MODEL") {
            config.generation.model = model;
        }
        if let Some(endpoint) = env("CAIRN_LLM_ENDPOINT") {
            config.generation.endpoint = Some(endpoint);
        }

        config.gemini_api_key = env("GEMINI_API_KEY").filter(|k| !k.is_empty());
        config.openai_api_key = env("OPENAI_API_KEY").filter(|k| !k.is_empty());

        if let Some(sources) = env("CAIRN_SOURCES") {
            config.sources = split_sources(&sources);
        }
        if let Some(v) = env("CAIRN_TOP_K") {
            config.rag.top_k = parse_number("CAIRN_TOP_K", &v)?;
        }
        if let Some(v) = env("CAIRN_MAX_CONTEXT_CHARS") {
            config.rag.max_context_chars = parse_number("CAIRN_MAX_CONTEXT_CHARS", &v)?;
        }
        if let Some(v) = env("CAIRN_CHUNK_SIZE") {
            config.rag.chunk_size = parse_number("CAIRN_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = env("CAIRN_CHUNK_OVERLAP") {
            config.rag.chunk_overlap = parse_number("CAIRN_CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = env("CAIRN_EMBED_BATCH") {
            config.rag.embed_batch_size = parse_number("CAIRN_EMBED_BATCH", &v)?;
        }

        if let Some(level) = env("RUST_LOG") {
            config.log_level = Some(level);
        }
        if env("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &Path) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                self.embedding.provider = provider.to_lowercase();
            }
            if let Some(model) = embedding.model {
                self.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                self.embedding.dimensions = dimensions;
            }
            if embedding.endpoint.is_some() {
                self.embedding.endpoint = embedding.endpoint;
            }
        }

        if let Some(generation) = file.generation {
            if let Some(provider) = generation.provider {
                self.generation.provider = provider.to_lowercase();
            }
            if let Some(model) = generation.model {
                self.generation.model = model;
            }
            if generation.endpoint.is_some() {
                self.generation.endpoint = generation.endpoint;
            }
        }

        if let Some(sources) = file.sources {
            self.sources = sources;
        }

        if let Some(retrieval) = file.retrieval {
            if let Some(top_k) = retrieval.top_k {
                self.rag.top_k = top_k;
            }
            if let Some(max) = retrieval.max_context_chars {
                self.rag.max_context_chars = max;
            }
        }

        if let Some(chunking) = file.chunking {
            if let Some(size) = chunking.size {
                self.rag.chunk_size = size;
            }
            if let Some(overlap) = chunking.overlap {
                self.rag.chunk_overlap = overlap;
            }
            if let Some(batch) = chunking.embed_batch_size {
                self.rag.embed_batch_size = batch;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        embedding_provider: Option<String>,
        llm_provider: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }

        if let Some(provider) = embedding_provider {
            self.embedding.provider = provider.to_lowercase();
        }

        if let Some(provider) = llm_provider {
            self.generation.provider = provider.to_lowercase();
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Resolve the API key used by a provider, if it needs one.
    pub fn resolve_api_key(&self, provider: &str) -> Option<&str> {
        match provider {
            "gemini" => self.gemini_api_key.as_deref(),
            "openai" => self.openai_api_key.as_deref(),
            _ => None,
        }
    }

    /// Validate everything `ask` needs: embedding side plus the generation provider.
    pub fn validate(&self) -> AppResult<()> {
        self.validate_embedding()?;

        if !GENERATION_PROVIDERS.contains(&self.generation.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown generation provider: {}. Supported: {}",
                self.generation.provider,
                GENERATION_PROVIDERS.join(", ")
            )));
        }
        self.require_api_key(&self.generation.provider)?;

        if self.rag.top_k == 0 {
            return Err(AppError::Config("top_k must be greater than zero".to_string()));
        }
        if self.rag.max_context_chars == 0 {
            return Err(AppError::Config(
                "max_context_chars must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate what ingestion and search need: the embedding provider and
    /// chunking parameters.
    pub fn validate_embedding(&self) -> AppResult<()> {
        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }
        self.require_api_key(&self.embedding.provider)?;

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        let rag = &self.rag;
        if rag.chunk_size == 0 {
            return Err(AppError::Config("Chunk size must be greater than zero".to_string()));
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }
        if rag.embed_batch_size == 0 {
            return Err(AppError::Config(
                "Embedding batch size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    fn require_api_key(&self, provider: &str) -> AppResult<()> {
        if is_hosted(provider) && self.resolve_api_key(provider).is_none() {
            return Err(AppError::Config(format!(
                "API key not found for provider '{}'. Set {}_API_KEY.",
                provider,
                provider.to_uppercase()
            )));
        }
        Ok(())
    }
}

fn is_hosted(provider: &str) -> bool {
    matches!(provider, "gemini" | "openai")
}

fn split_sources(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number(var: &str, value: &str) -> AppResult<usize> {
    value.trim().parse::<usize>().map_err(|e| {
        AppError::Config(format!("{} must be a non-negative integer, got '{}': {}", var, value, e))
    })
}
