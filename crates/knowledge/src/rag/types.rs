//! Pipeline result types.

use crate::types::Answer;
use serde::{Deserialize, Serialize};

/// Outcome of a best-effort pipeline stage.
///
/// `Degraded` carries the fallback value the pipeline continues with and why
/// the stage could not complete normally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage<T> {
    Complete(T),
    Degraded { value: T, reason: String },
}

impl<T> Stage<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Complete(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Complete(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Reason for the fallback, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Complete(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// Everything one question went through, for `--trace` and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineTrace {
    /// The question as asked
    pub question: String,

    /// Search query used for retrieval
    pub expanded: Stage<String>,

    /// Number of passages handed to the synthesizer
    pub retrieved: usize,

    pub answer: Stage<Answer>,
}
