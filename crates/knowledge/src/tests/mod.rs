//! Shared test doubles and cross-module tests.

mod rag_ranking;

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::index::{IndexSnapshot, Matrix};
use crate::retriever::Retriever;
use crate::types::{Passage, RetrievalResult};
use cairn_core::{AppError, AppResult};
use cairn_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<String>,
    fail: bool,
    prompts: Vec<String>,
}

/// Language model that answers from a fixed script and records prompts.
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect the other.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedLlm {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedLlm {
    /// Reply with `replies` in order; calls past the end fail.
    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = ScriptState {
            replies: replies.into_iter().map(Into::into).collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Fail every call with a provider error.
    pub fn failing() -> Self {
        let state = ScriptState {
            fail: true,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.state.lock().unwrap().prompts.clone()
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().prompts.len()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let mut state = self.state.lock().unwrap();
        state.prompts.push(request.prompt.clone());

        if state.fail {
            return Err(AppError::Provider("scripted outage".to_string()));
        }

        let content = state
            .replies
            .pop_front()
            .ok_or_else(|| AppError::Provider("script exhausted".to_string()))?;

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
        })
    }
}

/// Embedder whose every call fails.
#[derive(Debug)]
pub(crate) struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn provider_name(&self) -> &str {
        "failing"
    }

    fn model_name(&self) -> &str {
        "none"
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn max_batch_size(&self) -> usize {
        usize::MAX
    }

    async fn embed_request(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::Provider("embedding endpoint unreachable".to_string()))
    }
}

/// Embedder that fails on chosen call numbers (0-based) and otherwise
/// returns `[1.0, text length]` per text.
#[derive(Debug, Default)]
pub(crate) struct FlakyEmbedder {
    fail_on: Vec<usize>,
    calls: Mutex<usize>,
}

impl FlakyEmbedder {
    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_on: calls.to_vec(),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    fn provider_name(&self) -> &str {
        "flaky"
    }

    fn model_name(&self) -> &str {
        "flaky-1"
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn max_batch_size(&self) -> usize {
        usize::MAX
    }

    async fn embed_request(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls - 1
        };
        if self.fail_on.contains(&call) {
            return Err(AppError::Provider(format!("call {} rejected", call)));
        }
        Ok(texts
            .iter()
            .map(|t| vec![1.0, t.chars().count() as f32])
            .collect())
    }
}

/// A retrieval result sourced from the Argentina article.
pub(crate) fn retrieval(id: &str, text: impl Into<String>) -> RetrievalResult {
    RetrievalResult {
        id: id.to_string(),
        source: "https://es.wikipedia.org/wiki/Argentina".to_string(),
        text: text.into(),
        score: 0.5,
    }
}

/// In-memory retriever over `passages` embedded with the trigram embedder.
pub(crate) async fn trigram_retriever(passages: &[Passage]) -> Arc<Retriever> {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(256));
    let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await.unwrap();

    let snapshot = IndexSnapshot {
        passages: passages.to_vec(),
        vectors: Matrix::from_rows(&vectors, embedder.dimensions()).unwrap(),
        manifest: None,
    };
    Arc::new(Retriever::from_snapshot(snapshot, embedder))
}
