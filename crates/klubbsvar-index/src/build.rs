//! Index construction: chunks in, published artifacts out.

use indicatif::{ProgressBar, ProgressStyle};

use klubbsvar_core::types::Chunk;
use klubbsvar_core::Result;
use klubbsvar_embed::EmbedProvider;

use crate::artifacts::IndexArtifacts;
use crate::tfidf::{TfidfSettings, TfidfVectorizer};

const EMBED_BATCH: usize = 64;

/// Fit a TF-IDF vectorizer over the corpus and project every chunk through
/// it. Infallible: an empty corpus produces a valid zero-row index.
pub fn build_sparse(chunks: Vec<Chunk>, settings: TfidfSettings) -> IndexArtifacts {
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let vectorizer = TfidfVectorizer::fit(&texts, settings);
    let rows = chunks
        .iter()
        .map(|c| vectorizer.transform(&c.text))
        .collect();
    tracing::info!(
        rows = chunks.len(),
        vocabulary = vectorizer.vocabulary_len(),
        "sparse index built"
    );
    IndexArtifacts::sparse(chunks, rows, vectorizer)
}

/// Embed every chunk through the provider, in batches. Any provider failure
/// aborts the build — a partially embedded index is never produced.
pub fn build_dense(chunks: Vec<Chunk>, provider: &dyn EmbedProvider) -> Result<IndexArtifacts> {
    let mut rows: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        rows.extend(provider.embed_batch(&texts)?);
        pb.set_position(rows.len() as u64);
    }
    pb.finish_and_clear();
    tracing::info!(rows = rows.len(), embedder = provider.id(), "dense index built");
    Ok(IndexArtifacts::dense(chunks, rows, provider.id().to_string()))
}
