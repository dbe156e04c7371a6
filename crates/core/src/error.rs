//! Error types for Cairn.
//!
//! A single error enum covers configuration, I/O, provider calls, the
//! persisted index, source ingestion, prompt rendering and serialization.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for Cairn.
///
/// Library functions return `Result<T, AppError>` and never panic on bad
/// input; failures are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding or language-model provider failures (auth, rate limit, network, bad payload)
    #[error("Provider error: {0}")]
    Provider(String),

    /// The persisted index snapshot is absent
    #[error("Index not found at {0:?}. Run 'cairn ingest' first.")]
    IndexMissing(PathBuf),

    /// The persisted index is corrupt or inconsistent
    #[error("Index error: {0}")]
    Index(String),

    /// A single source could not be fetched or parsed
    #[error("Malformed source '{origin}': {reason}")]
    MalformedSource { origin: String, reason: String },

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build a `MalformedSource` error.
    pub fn malformed_source(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::MalformedSource {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_missing_message_mentions_ingest() {
        let err = AppError::IndexMissing(PathBuf::from("data"));
        assert!(err.to_string().contains("cairn ingest"));
    }

    #[test]
    fn test_malformed_source_message() {
        let err = AppError::malformed_source("https://example.org", "HTTP 404");
        let msg = err.to_string();
        assert!(msg.contains("https://example.org"));
        assert!(msg.contains("HTTP 404"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
