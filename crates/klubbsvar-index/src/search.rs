//! Similarity search over the loaded vector space.

use std::path::Path;

use klubbsvar_core::types::{Chunk, SearchHit};
use klubbsvar_core::{Error, Result};
use klubbsvar_embed::EmbedProvider;

use crate::artifacts::{IndexArtifacts, Rows};
use crate::tfidf::{SparseVector, TfidfSettings, TfidfVectorizer};

/// The active vector space, fixed at build time. Both variants project a
/// query and score it against every row with an inner product; rows and
/// query vectors are L2-normalized, so the product is cosine similarity.
pub enum VectorSpace {
    Sparse {
        vectorizer: TfidfVectorizer,
        rows: Vec<SparseVector>,
    },
    Dense {
        embedder: Box<dyn EmbedProvider>,
        rows: Vec<Vec<f32>>,
    },
}

impl VectorSpace {
    /// Fit a fresh sparse space over already-loaded chunks. Used as the
    /// query-time fallback when a dense index's provider is unreachable.
    pub fn fit_sparse(chunks: &[Chunk]) -> Self {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectorizer = TfidfVectorizer::fit(&texts, TfidfSettings::default());
        let rows = chunks
            .iter()
            .map(|c| vectorizer.transform(&c.text))
            .collect();
        VectorSpace::Sparse { vectorizer, rows }
    }

    pub fn len(&self) -> usize {
        match self {
            VectorSpace::Sparse { rows, .. } => rows.len(),
            VectorSpace::Dense { rows, .. } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Similarity of `query` against every indexed row, in row order.
    pub fn score_all(&self, query: &str) -> Result<Vec<f32>> {
        match self {
            VectorSpace::Sparse { vectorizer, rows } => {
                let q = vectorizer.transform(query);
                Ok(rows.iter().map(|r| r.dot(&q)).collect())
            }
            VectorSpace::Dense { embedder, rows } => {
                let q = embedder
                    .embed_batch(&[query.to_string()])?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        Error::Capability("embedding provider returned no vector".to_string())
                    })?;
                if let Some(first) = rows.first() {
                    if q.len() != first.len() {
                        return Err(Error::Capability(format!(
                            "query embedding has dimension {} but the index has {}",
                            q.len(),
                            first.len()
                        )));
                    }
                }
                Ok(rows
                    .iter()
                    .map(|r| r.iter().zip(&q).map(|(x, y)| x * y).sum())
                    .collect())
            }
        }
    }
}

/// Top-`n` hits for a score vector, descending, ties kept in corpus order.
pub fn rank_hits(scores: &[f32], chunks: &[Chunk], n: usize) -> Vec<SearchHit> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // Stable sort: equal scores keep ascending row order.
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order.truncate(n);
    order
        .into_iter()
        .map(|i| SearchHit {
            chunk: chunks[i].clone(),
            score: scores[i],
        })
        .collect()
}

/// A loaded, immutable index: the vector space plus its parallel chunk
/// metadata. Read-only at query time, so shared references may search
/// concurrently; rebuilds publish a new directory and the host constructs a
/// fresh `Searcher`.
pub struct Searcher {
    space: VectorSpace,
    chunks: Vec<Chunk>,
}

impl Searcher {
    pub fn new(space: VectorSpace, chunks: Vec<Chunk>) -> Result<Self> {
        if space.len() != chunks.len() {
            return Err(Error::IndexCorrupt(format!(
                "vector space has {} rows but metadata has {}",
                space.len(),
                chunks.len()
            )));
        }
        Ok(Self { space, chunks })
    }

    /// Load the published artifacts from `data_dir`. `embedder` is required
    /// for a dense index and must be the provider recorded in the manifest.
    pub fn open(data_dir: &Path, embedder: Option<Box<dyn EmbedProvider>>) -> Result<Self> {
        let artifacts = IndexArtifacts::load(data_dir)?;
        let space = match artifacts.rows {
            Rows::Sparse(rows) => {
                let vectorizer = artifacts.vectorizer.ok_or_else(|| {
                    Error::IndexCorrupt("sparse index is missing its vectorizer state".to_string())
                })?;
                VectorSpace::Sparse { vectorizer, rows }
            }
            Rows::Dense(rows) => {
                let embedder = embedder.ok_or_else(|| {
                    Error::Config(
                        "the index was built with embeddings; configure an embedding \
                         provider or rebuild in sparse mode"
                            .to_string(),
                    )
                })?;
                if let Some(id) = &artifacts.manifest.embedder_id {
                    if embedder.id() != id {
                        return Err(Error::IndexCorrupt(format!(
                            "index was embedded by '{id}' but the configured provider is '{}'",
                            embedder.id()
                        )));
                    }
                }
                VectorSpace::Dense { embedder, rows }
            }
        };
        Self::new(space, artifacts.chunks)
    }

    /// Top-`n` chunks by raw similarity, descending. Returns fewer than `n`
    /// only when the corpus itself is smaller.
    pub fn search(&self, query: &str, n: usize) -> Result<Vec<SearchHit>> {
        let scores = self.space.score_all(query)?;
        Ok(rank_hits(&scores, &self.chunks, n))
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
