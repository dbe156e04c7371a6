//! Ranking correctness over a snapshot written to disk and loaded back.

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::index::IndexBuilder;
use crate::retriever::Retriever;
use crate::types::Passage;
use std::sync::Arc;
use tempfile::TempDir;

/// Write `rows` as an index and load it with a trigram embedder of matching width.
fn load_index(dir: &TempDir, rows: &[(&str, &str, Vec<f32>)]) -> Retriever {
    let dims = rows.first().map_or(3, |(_, _, v)| v.len());
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(dims));

    let passages: Vec<Passage> = rows
        .iter()
        .map(|(id, text, _)| Passage::new(*id, "corpus.md", *text))
        .collect();
    let vectors: Vec<Vec<f32>> = rows.iter().map(|(_, _, v)| v.clone()).collect();

    IndexBuilder::new(dir.path(), embedder.model_id(), dims)
        .write(&passages, &vectors, &["corpus.md".to_string()])
        .unwrap();

    Retriever::load(dir.path(), embedder).unwrap()
}

#[test]
fn test_relevant_query_returns_high_scores() {
    let dir = TempDir::new().unwrap();
    let retriever = load_index(
        &dir,
        &[
            ("p1", "La Revolución de Mayo de 1810", vec![1.0, 0.5, 0.2, 0.1]),
            ("p2", "Recetas de empanadas salteñas", vec![-0.3, -0.8, 0.4, -0.2]),
        ],
    );

    let results = retriever.search_vector(vec![0.9, 0.4, 0.3, 0.1], 5).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "p1", "Most relevant passage should be first");
    assert!(results[0].score > 0.8, "Relevant score should be high: {}", results[0].score);
    assert!(results[0].score > results[1].score, "Scores should be ordered");
}

#[test]
fn test_unrelated_query_returns_low_scores() {
    let dir = TempDir::new().unwrap();
    let retriever = load_index(&dir, &[("p1", "Glaciares patagónicos", vec![1.0, 0.0, 0.0, 0.0])]);

    let results = retriever.search_vector(vec![0.0, 1.0, 0.0, 0.0], 5).unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].score.abs() < 1e-5, "Orthogonal score should be ~0: {}", results[0].score);
}

#[test]
fn test_scores_are_ordered_descending() {
    let dir = TempDir::new().unwrap();
    let retriever = load_index(
        &dir,
        &[
            ("a", "Texto A", vec![1.0, 0.0, 0.0]),
            ("b", "Texto B", vec![0.7, 0.7, 0.0]),
            ("c", "Texto C", vec![0.0, 1.0, 0.0]),
            ("d", "Texto D", vec![-1.0, 0.0, 0.0]),
        ],
    );

    let results = retriever.search_vector(vec![1.0, 0.0, 0.0], 10).unwrap();

    for pair in results.windows(2) {
        assert!(
            pair[0].score >= pair[1].score,
            "Scores should be ordered: {} >= {}",
            pair[0].score,
            pair[1].score
        );
    }
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    assert!(results[0].score > 0.99, "Perfect match should score near 1.0");
}

#[test]
fn test_opposite_vector_scores_negative() {
    let dir = TempDir::new().unwrap();
    let retriever = load_index(&dir, &[("p1", "Contenido opuesto", vec![-1.0, 0.0, 0.0])]);

    let results = retriever.search_vector(vec![1.0, 0.0, 0.0], 5).unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].score > -1.01 && results[0].score < -0.99);
}

#[test]
fn test_magnitude_does_not_affect_ranking() {
    let dir = TempDir::new().unwrap();
    let retriever = load_index(
        &dir,
        &[
            ("long", "Un vector largo", vec![100.0, 1.0, 0.0]),
            ("aligned", "Un vector alineado", vec![0.2, 0.0, 0.0]),
        ],
    );

    let results = retriever.search_vector(vec![3.0, 0.0, 0.0], 2).unwrap();
    assert_eq!(results[0].id, "aligned");
}

#[test]
fn test_top_k_limit_respected() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<(String, String, Vec<f32>)> = (0..10)
        .map(|i| (format!("p{}", i), format!("Texto {}", i), vec![i as f32 + 1.0, 1.0, 0.0]))
        .collect();
    let borrowed: Vec<(&str, &str, Vec<f32>)> = rows
        .iter()
        .map(|(id, text, v)| (id.as_str(), text.as_str(), v.clone()))
        .collect();
    let retriever = load_index(&dir, &borrowed);

    let results = retriever.search_vector(vec![1.0, 0.0, 0.0], 3).unwrap();

    assert_eq!(results.len(), 3, "Should return exactly top_k results");
    assert_eq!(results[0].id, "p9");
}
