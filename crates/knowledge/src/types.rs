//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// A contiguous span of normalized source text, the atomic unit of retrieval.
///
/// This is also the per-line record of `chunks.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Stable identifier, unique within the index
    pub id: String,

    /// Origin reference (URL or path)
    pub source: String,

    /// Passage content
    pub text: String,
}

impl Passage {
    pub fn new(id: impl Into<String>, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            text: text.into(),
        }
    }
}

/// A passage annotated with its similarity to a query. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Passage identifier; may be empty for passages built outside the index
    #[serde(default)]
    pub id: String,

    pub source: String,

    pub text: String,

    /// Cosine similarity, 1.0 meaning identical direction
    pub score: f32,
}

impl RetrievalResult {
    /// Attach a score to a passage.
    pub fn from_passage(passage: &Passage, score: f32) -> Self {
        Self {
            id: passage.id.clone(),
            source: passage.source.clone(),
            text: passage.text.clone(),
            score,
        }
    }
}

/// Public-facing projection of a passage used in an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub source: String,
}

/// A grounded answer with its citations, as returned to the question-asking caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Model output, or a fixed explanatory text
    #[serde(rename = "answer")]
    pub text: String,

    /// One citation per retrieved passage, in retrieval order
    pub citations: Vec<Citation>,
}

impl Answer {
    /// An answer that carries no citations (guard clauses and failures).
    pub fn uncited(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Passages written to the index
    pub indexed: usize,

    /// Sources that failed to load
    pub skipped_sources: Vec<String>,

    /// Embedding batches dropped after a provider failure
    pub skipped_batches: usize,

    /// `provider:model` of the embedder used
    pub embedding_model: String,

    /// Sources requested for this run
    pub sources: Vec<String>,

    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_serializes_to_boundary_shape() {
        let answer = Answer {
            text: "La independencia se declaró en 1816 [0].".to_string(),
            citations: vec![Citation {
                id: "abc_0".to_string(),
                source: "https://es.wikipedia.org/wiki/Argentina".to_string(),
            }],
        };

        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["answer"], "La independencia se declaró en 1816 [0].");
        assert_eq!(json["citations"][0]["id"], "abc_0");
        assert_eq!(
            json["citations"][0]["source"],
            "https://es.wikipedia.org/wiki/Argentina"
        );
        assert!(json["citations"][0].get("text").is_none());
    }

    #[test]
    fn test_passage_record_round_trip() {
        let line = r#"{"id":"a1b2_3","source":"doc.md","text":"Texto"}"#;
        let passage: Passage = serde_json::from_str(line).unwrap();
        assert_eq!(passage, Passage::new("a1b2_3", "doc.md", "Texto"));
    }

    #[test]
    fn test_uncited_answer() {
        let answer = Answer::uncited("sin material");
        assert!(answer.citations.is_empty());
    }
}
