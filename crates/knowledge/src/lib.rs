//! Cited-answer retrieval engine.
//!
//! Ingestion turns sources into an on-disk snapshot of passages and their
//! embeddings; at query time the [`Retriever`] ranks passages by cosine
//! similarity and the [`rag`] stages turn them into an answer with citations.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod progress;
pub mod rag;
pub mod retriever;
pub mod source;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use index::{IndexManifest, IndexSnapshot};
pub use ingest::{ingest, IngestOptions};
pub use progress::{ProgressEvent, ProgressReporter};
pub use rag::{PipelineTrace, RagPipeline, Stage};
pub use retriever::Retriever;
pub use types::{Answer, Citation, IngestReport, Passage, RetrievalResult};
