//! Retrieval-augmented answering.
//!
//! Three stages run in sequence for every question: query expansion,
//! retrieval and grounded synthesis. The optional stages report fallbacks as
//! [`Stage::Degraded`] instead of failing.

pub mod expand;
pub mod pipeline;
pub mod prompt;
pub mod synthesize;
pub mod types;

pub use expand::{clean_expanded_query, QueryExpander};
pub use pipeline::RagPipeline;
pub use prompt::PromptTemplates;
pub use synthesize::{
    build_context, format_citations, AnswerSynthesizer, FRAGMENTARY_ANSWER, NO_MATERIAL_ANSWER,
    TECHNICAL_FAILURE_ANSWER,
};
pub use types::{PipelineTrace, Stage};
