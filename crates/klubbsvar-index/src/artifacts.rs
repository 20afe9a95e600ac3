//! Persisted index artifacts.
//!
//! One index is one atomic unit of four files under `<data_dir>/index/`:
//! `manifest.json`, `meta.jsonl` (one chunk per row), `vectors.jsonl`
//! (one vector per row, same order) and, in sparse mode, `vectorizer.json`.
//! A build writes the whole set into `<data_dir>/index.staging/` and
//! publishes it with a rename, so readers never observe a half-written
//! index. Never regenerate one file without the others.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use klubbsvar_core::types::Chunk;
use klubbsvar_core::{Error, Result};

use crate::tfidf::{SparseVector, TfidfVectorizer};

pub const INDEX_DIR: &str = "index";
const STAGING_DIR: &str = "index.staging";
const MANIFEST_FILE: &str = "manifest.json";
const META_FILE: &str = "meta.jsonl";
const VECTORS_FILE: &str = "vectors.jsonl";
const VECTORIZER_FILE: &str = "vectorizer.json";

/// Which vector space backs the index. Selected once at build time; the
/// query-time embedding path must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    Sparse,
    Dense,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub mode: IndexMode,
    pub rows: usize,
    /// Dense embedding dimensionality; `None` in sparse mode.
    pub dim: Option<usize>,
    /// Identity of the provider that embedded the rows; `None` in sparse mode.
    pub embedder_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The vector matrix, one variant per mode.
#[derive(Debug, Clone)]
pub enum Rows {
    Sparse(Vec<SparseVector>),
    Dense(Vec<Vec<f32>>),
}

impl Rows {
    pub fn len(&self) -> usize {
        match self {
            Rows::Sparse(rows) => rows.len(),
            Rows::Dense(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct IndexArtifacts {
    pub manifest: Manifest,
    pub chunks: Vec<Chunk>,
    pub rows: Rows,
    /// Present iff `manifest.mode == Sparse`.
    pub vectorizer: Option<TfidfVectorizer>,
}

pub fn index_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(INDEX_DIR)
}

impl IndexArtifacts {
    pub fn sparse(chunks: Vec<Chunk>, rows: Vec<SparseVector>, vectorizer: TfidfVectorizer) -> Self {
        Self {
            manifest: Manifest {
                mode: IndexMode::Sparse,
                rows: rows.len(),
                dim: None,
                embedder_id: None,
                created_at: Utc::now(),
            },
            chunks,
            rows: Rows::Sparse(rows),
            vectorizer: Some(vectorizer),
        }
    }

    pub fn dense(chunks: Vec<Chunk>, rows: Vec<Vec<f32>>, embedder_id: String) -> Self {
        Self {
            manifest: Manifest {
                mode: IndexMode::Dense,
                rows: rows.len(),
                dim: rows.first().map(Vec::len),
                embedder_id: Some(embedder_id),
                created_at: Utc::now(),
            },
            chunks,
            rows: Rows::Dense(rows),
            vectorizer: None,
        }
    }

    /// Write all artifacts into a staging directory and publish atomically.
    /// Returns the published index directory.
    pub fn save(&self, data_dir: &Path) -> Result<PathBuf> {
        if self.rows.len() != self.chunks.len() {
            return Err(Error::IndexCorrupt(format!(
                "refusing to write {} vector rows against {} metadata rows",
                self.rows.len(),
                self.chunks.len()
            )));
        }

        fs::create_dir_all(data_dir)?;
        let staging = data_dir.join(STAGING_DIR);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        write_json(&staging.join(MANIFEST_FILE), &self.manifest)?;

        let mut meta = BufWriter::new(File::create(staging.join(META_FILE))?);
        for chunk in &self.chunks {
            serde_json::to_writer(&mut meta, chunk)
                .map_err(|e| Error::IndexCorrupt(format!("failed to encode {META_FILE}: {e}")))?;
            meta.write_all(b"\n")?;
        }
        meta.flush()?;

        let mut vectors = BufWriter::new(File::create(staging.join(VECTORS_FILE))?);
        match &self.rows {
            Rows::Sparse(rows) => {
                for row in rows {
                    serde_json::to_writer(&mut vectors, row).map_err(|e| {
                        Error::IndexCorrupt(format!("failed to encode {VECTORS_FILE}: {e}"))
                    })?;
                    vectors.write_all(b"\n")?;
                }
            }
            Rows::Dense(rows) => {
                for row in rows {
                    serde_json::to_writer(&mut vectors, row).map_err(|e| {
                        Error::IndexCorrupt(format!("failed to encode {VECTORS_FILE}: {e}"))
                    })?;
                    vectors.write_all(b"\n")?;
                }
            }
        }
        vectors.flush()?;

        if let Some(vectorizer) = &self.vectorizer {
            write_json(&staging.join(VECTORIZER_FILE), vectorizer)?;
        }

        let published = index_dir(data_dir);
        if published.exists() {
            fs::remove_dir_all(&published)?;
        }
        fs::rename(&staging, &published)?;
        tracing::info!(rows = self.rows.len(), dir = %published.display(), "index published");
        Ok(published)
    }

    /// Load and validate the artifact set. A missing index directory is
    /// `IndexMissing` (build one); anything inconsistent inside an existing
    /// directory is `IndexCorrupt` (rebuild, never patch over).
    pub fn load(data_dir: &Path) -> Result<Self> {
        let dir = index_dir(data_dir);
        if !dir.exists() {
            return Err(Error::IndexMissing { path: dir });
        }

        let manifest: Manifest = read_json(&dir.join(MANIFEST_FILE))?;
        let chunks = read_meta(&dir.join(META_FILE))?;
        let rows = read_vectors(&dir.join(VECTORS_FILE), manifest.mode)?;

        if rows.len() != chunks.len() {
            return Err(Error::IndexCorrupt(format!(
                "{VECTORS_FILE} has {} rows but {META_FILE} has {}",
                rows.len(),
                chunks.len()
            )));
        }
        if rows.len() != manifest.rows {
            return Err(Error::IndexCorrupt(format!(
                "{MANIFEST_FILE} declares {} rows but {VECTORS_FILE} has {}",
                manifest.rows,
                rows.len()
            )));
        }

        let vectorizer = match manifest.mode {
            IndexMode::Sparse => Some(read_json(&dir.join(VECTORIZER_FILE))?),
            IndexMode::Dense => {
                if let (Some(dim), Rows::Dense(dense)) = (manifest.dim, &rows) {
                    if let Some(bad) = dense.iter().position(|r| r.len() != dim) {
                        return Err(Error::IndexCorrupt(format!(
                            "{VECTORS_FILE} row {bad} has dimension {} instead of {dim}",
                            dense[bad].len()
                        )));
                    }
                }
                None
            }
        };

        Ok(Self {
            manifest,
            chunks,
            rows,
            vectorizer,
        })
    }
}

/// Read just the manifest, e.g. to learn the mode before deciding whether an
/// embedding provider is needed.
pub fn load_manifest(data_dir: &Path) -> Result<Manifest> {
    let dir = index_dir(data_dir);
    if !dir.exists() {
        return Err(Error::IndexMissing { path: dir });
    }
    read_json(&dir.join(MANIFEST_FILE))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, value).map_err(|e| {
        Error::IndexCorrupt(format!("failed to encode {}: {e}", path.display()))
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| missing_file(path, &e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::IndexCorrupt(format!("unreadable {}: {e}", path.display())))
}

fn read_meta(path: &Path) -> Result<Vec<Chunk>> {
    let file = File::open(path).map_err(|e| missing_file(path, &e))?;
    let mut chunks = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let chunk = serde_json::from_str(&line).map_err(|e| {
            Error::IndexCorrupt(format!("{} line {}: {e}", path.display(), lineno + 1))
        })?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

fn read_vectors(path: &Path, mode: IndexMode) -> Result<Rows> {
    let file = File::open(path).map_err(|e| missing_file(path, &e))?;
    let mut sparse = Vec::new();
    let mut dense = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let corrupt = |e: serde_json::Error| {
            Error::IndexCorrupt(format!("{} line {}: {e}", path.display(), lineno + 1))
        };
        match mode {
            IndexMode::Sparse => sparse.push(serde_json::from_str(&line).map_err(corrupt)?),
            IndexMode::Dense => dense.push(serde_json::from_str(&line).map_err(corrupt)?),
        }
    }
    Ok(match mode {
        IndexMode::Sparse => Rows::Sparse(sparse),
        IndexMode::Dense => Rows::Dense(dense),
    })
}

fn missing_file(path: &Path, e: &std::io::Error) -> Error {
    // The directory was published atomically, so a file missing inside it
    // means the set was tampered with, not that the index was never built.
    Error::IndexCorrupt(format!("cannot open {}: {e}", path.display()))
}
