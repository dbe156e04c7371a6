//! Exact nearest-neighbour retrieval over a loaded snapshot.

use crate::embeddings::EmbeddingProvider;
use crate::index::{IndexSnapshot, Matrix};
use crate::types::{Passage, RetrievalResult};
use cairn_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;

/// Guards the normalization of zero vectors.
const NORM_EPSILON: f32 = 1e-8;

/// Scale `v` to unit length as `v / (||v|| + ε)`.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in v.iter_mut() {
        *x /= norm + NORM_EPSILON;
    }
}

/// Brute-force cosine search over normalized passage vectors.
///
/// Loaded once and immutable afterwards; concurrent searches share it freely.
#[derive(Debug)]
pub struct Retriever {
    passages: Vec<Passage>,
    vectors: Matrix,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    /// Load the snapshot in `dir`.
    ///
    /// Fails with `IndexMissing` when the snapshot is absent and with `Index`
    /// when the manifest names a different embedding model than `embedder`.
    pub fn load(dir: &Path, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let snapshot = IndexSnapshot::read(dir)?;

        match &snapshot.manifest {
            Some(manifest) if manifest.embedding_model != embedder.model_id() => {
                return Err(AppError::Index(format!(
                    "Index was built with '{}' but the active embedding model is '{}'. Re-run 'cairn ingest'.",
                    manifest.embedding_model,
                    embedder.model_id()
                )));
            }
            Some(_) => {}
            None => tracing::warn!(
                "Index at {:?} has no manifest; cannot verify embedding model '{}'",
                dir,
                embedder.model_id()
            ),
        }

        let retriever = Self::from_snapshot(snapshot, embedder);
        tracing::info!(
            "Retriever ready: {} passages, {} dimensions",
            retriever.len(),
            retriever.vectors.cols
        );
        Ok(retriever)
    }

    /// Build from an in-memory snapshot, normalizing every row.
    pub fn from_snapshot(snapshot: IndexSnapshot, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let mut vectors = snapshot.vectors;
        let cols = vectors.cols.max(1);
        for row in vectors.data.chunks_exact_mut(cols) {
            l2_normalize(row);
        }

        Self {
            passages: snapshot.passages,
            vectors,
            embedder,
        }
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Embed `query` and return its `min(k, len)` nearest passages.
    pub async fn search(&self, query: &str, k: usize) -> AppResult<Vec<RetrievalResult>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed(query).await?;
        self.search_vector(query_vector, k)
    }

    /// Rank passages against an already embedded query.
    ///
    /// Ordered by ascending cosine distance; ties keep index order.
    pub fn search_vector(&self, mut query: Vec<f32>, k: usize) -> AppResult<Vec<RetrievalResult>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.vectors.cols {
            return Err(AppError::Index(format!(
                "Query embedding has {} dimensions, index has {}",
                query.len(),
                self.vectors.cols
            )));
        }

        l2_normalize(&mut query);

        let mut distances: Vec<(usize, f32)> = self
            .vectors
            .iter_rows()
            .map(|row| 1.0 - dot(row, &query))
            .enumerate()
            .collect();

        // sort_by is stable, so equal distances stay in insertion order
        distances.sort_by(|a, b| a.1.total_cmp(&b.1));
        distances.truncate(k.min(self.passages.len()));

        let results: Vec<RetrievalResult> = distances
            .into_iter()
            .map(|(i, distance)| RetrievalResult::from_passage(&self.passages[i], 1.0 - distance))
            .collect();

        tracing::debug!(
            "Retrieved {} passages (top score: {:.3})",
            results.len(),
            results.first().map_or(0.0, |r| r.score)
        );

        Ok(results)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
