//! Persisted index snapshot.
//!
//! A snapshot directory holds three co-located files:
//! - `embeddings.npy`: `f32` matrix, row *i* belongs to passage *i*
//! - `chunks.jsonl`: one `{id, source, text}` record per line, same order
//! - `manifest.json`: embedding model identity and build metadata
//!
//! Snapshots are built wholesale and read-only afterwards.

pub mod npy;

pub use npy::Matrix;

use crate::types::Passage;
use cairn_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const EMBEDDINGS_FILE: &str = "embeddings.npy";
pub const CHUNKS_FILE: &str = "chunks.jsonl";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Identity and build metadata of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// `provider:model` of the embedder that produced the matrix
    pub embedding_model: String,
    pub dimensions: usize,
    pub passages: usize,
    pub sources: Vec<String>,
    pub built_at: DateTime<Utc>,
}

/// A loaded snapshot.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub passages: Vec<Passage>,
    pub vectors: Matrix,
    /// Absent for snapshots written by older tooling
    pub manifest: Option<IndexManifest>,
}

impl IndexSnapshot {
    /// Whether both data files are present in `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(EMBEDDINGS_FILE).is_file() && dir.join(CHUNKS_FILE).is_file()
    }

    /// Load vectors and metadata, checking that they line up.
    pub fn read(dir: &Path) -> AppResult<Self> {
        if !Self::exists(dir) {
            return Err(AppError::IndexMissing(dir.to_path_buf()));
        }

        let vectors = npy::read_matrix(&dir.join(EMBEDDINGS_FILE))?;
        let passages = read_jsonl(&dir.join(CHUNKS_FILE))?;

        if vectors.rows != passages.len() {
            return Err(AppError::Index(format!(
                "{} has {} rows but {} has {} records",
                EMBEDDINGS_FILE,
                vectors.rows,
                CHUNKS_FILE,
                passages.len()
            )));
        }

        let manifest = Self::read_manifest(dir)?;
        if let Some(m) = &manifest {
            if m.dimensions != vectors.cols && vectors.rows > 0 {
                return Err(AppError::Index(format!(
                    "manifest declares {} dimensions, matrix has {}",
                    m.dimensions, vectors.cols
                )));
            }
        }

        tracing::debug!(
            "Loaded index from {:?}: {} passages x {} dimensions",
            dir,
            vectors.rows,
            vectors.cols
        );

        Ok(Self {
            passages,
            vectors,
            manifest,
        })
    }

    /// Load passage metadata only, without touching the vector matrix.
    pub fn read_passages(dir: &Path) -> AppResult<Vec<Passage>> {
        let path = dir.join(CHUNKS_FILE);
        if !path.is_file() {
            return Err(AppError::IndexMissing(dir.to_path_buf()));
        }
        read_jsonl(&path)
    }

    /// Load the manifest, `None` when the file is absent.
    pub fn read_manifest(dir: &Path) -> AppResult<Option<IndexManifest>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let manifest = serde_json::from_str(&content)
            .map_err(|e| AppError::Index(format!("Invalid manifest {:?}: {}", path, e)))?;
        Ok(Some(manifest))
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.vectors.cols
    }
}

/// Writes a complete snapshot, replacing any previous one.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    dir: PathBuf,
    embedding_model: String,
    dimensions: usize,
}

impl IndexBuilder {
    /// `dimensions` is used for an empty corpus; otherwise the vectors decide.
    pub fn new(dir: impl Into<PathBuf>, embedding_model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            dir: dir.into(),
            embedding_model: embedding_model.into(),
            dimensions,
        }
    }

    /// Write `passages` and `vectors` (same order) plus the manifest.
    pub fn write(
        &self,
        passages: &[Passage],
        vectors: &[Vec<f32>],
        sources: &[String],
    ) -> AppResult<IndexManifest> {
        if passages.len() != vectors.len() {
            return Err(AppError::Index(format!(
                "Cannot build index: {} passages but {} vectors",
                passages.len(),
                vectors.len()
            )));
        }

        let dimensions = vectors.first().map_or(self.dimensions, Vec::len);
        let matrix = Matrix::from_rows(vectors, dimensions)?;

        fs::create_dir_all(&self.dir)?;

        // Write temp files first, then rename into place
        let npy_tmp = self.dir.join(format!("{}.tmp", EMBEDDINGS_FILE));
        npy::write_matrix(&npy_tmp, &matrix)?;

        let jsonl_tmp = self.dir.join(format!("{}.tmp", CHUNKS_FILE));
        write_jsonl(&jsonl_tmp, passages)?;

        let manifest = IndexManifest {
            embedding_model: self.embedding_model.clone(),
            dimensions,
            passages: passages.len(),
            sources: sources.to_vec(),
            built_at: Utc::now(),
        };
        let manifest_tmp = self.dir.join(format!("{}.tmp", MANIFEST_FILE));
        fs::write(&manifest_tmp, serde_json::to_string_pretty(&manifest)?)?;

        fs::rename(&npy_tmp, self.dir.join(EMBEDDINGS_FILE))?;
        fs::rename(&jsonl_tmp, self.dir.join(CHUNKS_FILE))?;
        fs::rename(&manifest_tmp, self.dir.join(MANIFEST_FILE))?;

        tracing::info!(
            "Wrote index to {:?}: {} passages, {} dimensions, model {}",
            self.dir,
            manifest.passages,
            manifest.dimensions,
            manifest.embedding_model
        );

        Ok(manifest)
    }
}

fn write_jsonl(path: &Path, passages: &[Passage]) -> AppResult<()> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for passage in passages {
        serde_json::to_writer(&mut writer, passage)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn read_jsonl(path: &Path) -> AppResult<Vec<Passage>> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut passages = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let passage: Passage = serde_json::from_str(&line).map_err(|e| {
            AppError::Index(format!("{:?} line {}: {}", path, line_no + 1, e))
        })?;
        passages.push(passage);
    }

    Ok(passages)
}
