//! Offline index build: load sources, chunk, embed, write the snapshot.
//!
//! Partial-failure tolerant. A source that cannot be loaded is skipped, and
//! an embedding batch that fails drops exactly its own passages, so the
//! written matrix and metadata stay row-aligned. A run that ends with no
//! passages because every source or every batch failed is an error, and the
//! existing snapshot is left in place.

use crate::chunker::chunk_text;
use crate::embeddings::EmbeddingProvider;
use crate::index::IndexBuilder;
use crate::progress::ProgressReporter;
use crate::source::SourceLoader;
use crate::types::{IngestReport, Passage};
use cairn_core::config::RagSettings;
use cairn_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;

/// Hex characters of the source digest used in passage ids.
const SOURCE_HASH_LEN: usize = 12;

/// Chunking and batching knobs of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embed_batch_size: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&RagSettings::default())
    }
}

impl From<&RagSettings> for IngestOptions {
    fn from(settings: &RagSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            embed_batch_size: settings.embed_batch_size,
        }
    }
}

/// Stable passage id: `<first 12 hex chars of sha256(source)>_<ordinal>`.
pub fn passage_id(source: &str, ordinal: usize) -> String {
    let digest = format!("{:x}", Sha256::digest(source.as_bytes()));
    format!("{}_{}", &digest[..SOURCE_HASH_LEN], ordinal)
}

/// Build the index in `data_dir` from `sources`, replacing any previous one.
///
/// Only writing the snapshot can fail the run; per-source and per-batch
/// failures are logged and counted in the report.
pub async fn ingest(
    sources: &[String],
    embedder: &dyn EmbeddingProvider,
    data_dir: &Path,
    options: IngestOptions,
    progress: &ProgressReporter,
) -> AppResult<IngestReport> {
    let start = Instant::now();
    let loader = SourceLoader::new()?;

    tracing::info!("Ingesting {} sources into {:?}", sources.len(), data_dir);

    let mut passages: Vec<Passage> = Vec::new();
    let mut skipped_sources = Vec::new();

    for (i, reference) in sources.iter().enumerate() {
        match loader.load(reference).await {
            Ok(documents) => {
                for document in documents {
                    let chunks = chunk_text(&document.text, options.chunk_size, options.chunk_overlap);
                    tracing::debug!("{}: {} chunks", document.source, chunks.len());
                    passages.extend(chunks.into_iter().enumerate().map(|(ordinal, text)| {
                        Passage::new(passage_id(&document.source, ordinal), &document.source, text)
                    }));
                }
                progress.fetch(i as u64 + 1, sources.len() as u64, reference, true);
            }
            Err(e) => {
                tracing::warn!("Skipping source {}: {}", reference, e);
                skipped_sources.push(reference.clone());
                progress.fetch(i as u64 + 1, sources.len() as u64, reference, false);
            }
        }
    }

    let model_id = embedder.model_id();
    let chunked = passages.len();
    let (kept, vectors, skipped_batches) =
        embed_passages(passages, embedder, options.embed_batch_size, &model_id, progress).await;

    if kept.is_empty() && !sources.is_empty() {
        if chunked > 0 {
            return Err(AppError::Provider(format!(
                "every embedding batch failed ({} passages); index at {:?} left unchanged",
                chunked, data_dir
            )));
        }
        if skipped_sources.len() == sources.len() {
            return Err(AppError::Index(format!(
                "none of the {} sources could be loaded; index at {:?} left unchanged",
                sources.len(),
                data_dir
            )));
        }
    }

    let manifest = IndexBuilder::new(data_dir, &model_id, embedder.dimensions())
        .write(&kept, &vectors, sources)?;
    progress.index(manifest.passages as u64, &data_dir.display().to_string());

    let report = IngestReport {
        indexed: manifest.passages,
        skipped_sources,
        skipped_batches,
        embedding_model: model_id,
        sources: sources.to_vec(),
        duration_secs: start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        "Indexed {} passages in {:.2}s ({} sources skipped, {} batches skipped)",
        report.indexed,
        report.duration_secs,
        report.skipped_sources.len(),
        report.skipped_batches
    );

    Ok(report)
}

/// Embed passages batch by batch, returning the survivors, their vectors and
/// the number of dropped batches.
async fn embed_passages(
    passages: Vec<Passage>,
    embedder: &dyn EmbeddingProvider,
    batch_size: usize,
    model_id: &str,
    progress: &ProgressReporter,
) -> (Vec<Passage>, Vec<Vec<f32>>, usize) {
    let total = passages.len() as u64;
    let mut kept = Vec::with_capacity(passages.len());
    let mut vectors = Vec::with_capacity(passages.len());
    let mut skipped_batches = 0usize;
    let mut done = 0u64;

    for batch in passages.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();

        match embedder.embed_batch(&texts).await {
            Ok(embedded) if embedded.len() == batch.len() => {
                kept.extend_from_slice(batch);
                vectors.extend(embedded);
            }
            Ok(embedded) => {
                tracing::warn!(
                    "Dropping batch at passage {}: {} vectors for {} texts",
                    done,
                    embedded.len(),
                    batch.len()
                );
                skipped_batches += 1;
            }
            Err(e) => {
                tracing::warn!("Dropping batch at passage {} ({} passages): {}", done, batch.len(), e);
                skipped_batches += 1;
            }
        }

        done += batch.len() as u64;
        progress.embed(done, total, model_id);
    }

    (kept, vectors, skipped_batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::index::IndexSnapshot;
    use crate::progress::ProgressEvent;
    use crate::retriever::Retriever;
    use crate::tests::{FailingEmbedder, FlakyEmbedder};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn options(batch: usize) -> IngestOptions {
        IngestOptions {
            chunk_size: 60,
            chunk_overlap: 10,
            embed_batch_size: batch,
        }
    }

    fn write_corpus(dir: &Path) -> String {
        let corpus = dir.join("corpus");
        fs::create_dir_all(&corpus).unwrap();
        fs::write(
            corpus.join("mayo.md"),
            "# Revolución de Mayo\n\nEl 25 de mayo de 1810 se formó la Primera Junta.\n\nEl Cabildo abierto desplazó al virrey Cisneros.\n",
        )
        .unwrap();
        fs::write(
            corpus.join("tucuman.txt"),
            "El Congreso de Tucumán declaró la independencia el 9 de julio de 1816.\nLos diputados juraron en la casa histórica.\n",
        )
        .unwrap();
        corpus.display().to_string()
    }

    #[test]
    fn test_passage_id_is_stable_and_short() {
        let a = passage_id("https://es.wikipedia.org/wiki/Argentina", 3);
        let b = passage_id("https://es.wikipedia.org/wiki/Argentina", 3);
        assert_eq!(a, b);

        let (hash, ordinal) = a.split_once('_').unwrap();
        assert_eq!(hash.len(), 12);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ordinal, "3");
        assert_ne!(passage_id("otra", 3), a);
    }

    #[tokio::test]
    async fn test_ingest_directory_then_search() {
        let tmp = TempDir::new().unwrap();
        let corpus = write_corpus(tmp.path());
        let data_dir = tmp.path().join("data");
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(256));

        let report = ingest(
            &[corpus],
            embedder.as_ref(),
            &data_dir,
            options(64),
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();

        assert!(report.indexed >= 2);
        assert!(report.skipped_sources.is_empty());
        assert_eq!(report.skipped_batches, 0);
        assert_eq!(report.embedding_model, "trigram:trigram-v1");

        let snapshot = IndexSnapshot::read(&data_dir).unwrap();
        assert_eq!(snapshot.len(), report.indexed);
        assert!(snapshot.passages.iter().all(|p| !p.text.is_empty()));
        assert!(snapshot.passages.iter().any(|p| p.source.ends_with("tucuman.txt")));
        assert!(!snapshot.passages.iter().any(|p| p.text.contains('#')));

        let retriever = Retriever::load(&data_dir, embedder).unwrap();
        let results = retriever
            .search("Congreso de Tucumán independencia 1816", 1)
            .await
            .unwrap();
        assert!(results[0].source.ends_with("tucuman.txt"));
    }

    #[tokio::test]
    async fn test_missing_source_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let corpus = write_corpus(tmp.path());
        let missing = tmp.path().join("no-existe").display().to_string();
        let data_dir = tmp.path().join("data");

        let events = Arc::new(Mutex::new(Vec::<ProgressEvent>::new()));
        let sink = events.clone();
        let progress = ProgressReporter::new(Arc::new(move |e| sink.lock().unwrap().push(e)));

        let report = ingest(
            &[missing.clone(), corpus],
            &TrigramProvider::new(64),
            &data_dir,
            options(64),
            &progress,
        )
        .await
        .unwrap();

        assert_eq!(report.skipped_sources, vec![missing]);
        assert!(report.indexed > 0);

        let phases: Vec<String> = events.lock().unwrap().iter().map(|e| e.phase.clone()).collect();
        assert_eq!(&phases[..2], &["fetch", "fetch"]);
        assert_eq!(phases.last().map(String::as_str), Some("index"));
    }

    #[tokio::test]
    async fn test_failed_batch_drops_only_its_passages() {
        let tmp = TempDir::new().unwrap();
        let corpus = write_corpus(tmp.path());
        let data_dir = tmp.path().join("data");

        let all = ingest(
            &[corpus.clone()],
            &FlakyEmbedder::default(),
            &data_dir,
            options(1),
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();
        let full = IndexSnapshot::read(&data_dir).unwrap();

        let embedder = FlakyEmbedder::failing_on(&[1]);
        let report = ingest(&[corpus], &embedder, &data_dir, options(1), &ProgressReporter::noop())
            .await
            .unwrap();

        assert_eq!(embedder.calls(), all.indexed);
        assert_eq!(report.skipped_batches, 1);
        assert_eq!(report.indexed, all.indexed - 1);

        let partial = IndexSnapshot::read(&data_dir).unwrap();
        let mut expected = full.passages.clone();
        expected.remove(1);
        assert_eq!(partial.passages, expected);
        for (i, passage) in partial.passages.iter().enumerate() {
            assert_eq!(partial.vectors.row(i)[1], passage.text.chars().count() as f32);
        }
    }

    #[tokio::test]
    async fn test_all_batches_failing_keeps_previous_index() {
        let tmp = TempDir::new().unwrap();
        let corpus = write_corpus(tmp.path());
        let data_dir = tmp.path().join("data");

        let first = ingest(
            &[corpus.clone()],
            &FlakyEmbedder::default(),
            &data_dir,
            options(1),
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();
        assert!(first.indexed > 0);

        let err = ingest(&[corpus], &FailingEmbedder, &data_dir, options(1), &ProgressReporter::noop())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Provider(ref m) if m.contains("left unchanged")));

        let snapshot = IndexSnapshot::read(&data_dir).unwrap();
        assert_eq!(snapshot.len(), first.indexed);
    }

    #[tokio::test]
    async fn test_all_sources_missing_keeps_previous_index() {
        let tmp = TempDir::new().unwrap();
        let corpus = write_corpus(tmp.path());
        let missing = tmp.path().join("no-existe").display().to_string();
        let data_dir = tmp.path().join("data");

        let first = ingest(
            &[corpus],
            &TrigramProvider::new(64),
            &data_dir,
            options(64),
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();

        let err = ingest(
            &[missing],
            &TrigramProvider::new(64),
            &data_dir,
            options(64),
            &ProgressReporter::noop(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Index(_)));

        let snapshot = IndexSnapshot::read(&data_dir).unwrap();
        assert_eq!(snapshot.len(), first.indexed);
    }

    #[tokio::test]
    async fn test_empty_source_list_writes_empty_index() {
        let tmp = TempDir::new().unwrap();
        let data_dir = tmp.path().join("data");

        let report = ingest(
            &[],
            &TrigramProvider::new(32),
            &data_dir,
            IngestOptions::default(),
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();

        assert_eq!(report.indexed, 0);
        let snapshot = IndexSnapshot::read(&data_dir).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.dimensions(), 32);
    }
}
