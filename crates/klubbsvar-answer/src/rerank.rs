//! Heuristic re-ranking of raw similarity hits.
//!
//! Raw cosine similarity knows nothing about the domain; the re-ranker adds
//! a bonus for hits whose document category matches the query's topic and a
//! capped per-term bonus for expansion terms literally present in the text,
//! then drops everything below a confidence floor. Both bonuses are
//! non-negative, so a hit never scores lower than its raw similarity.

use std::collections::BTreeSet;

use serde::Deserialize;

use klubbsvar_core::types::{DocType, SearchHit};

/// Scoring constants. Reference values below; deployments may tune them.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RerankTuning {
    /// Added when the hit's category is preferred by the query.
    pub category_bonus: f32,
    /// Added per expansion term found in the hit text.
    pub term_bonus: f32,
    /// Ceiling for the accumulated term bonus.
    pub term_bonus_cap: f32,
    /// Hits adjusted below this are dropped (boundary inclusive).
    pub min_score: f32,
}

impl Default for RerankTuning {
    fn default() -> Self {
        Self {
            category_bonus: 0.15,
            term_bonus: 0.02,
            term_bonus_cap: 0.10,
            min_score: 0.15,
        }
    }
}

/// Raw score plus category and term-presence bonuses.
pub fn adjusted_score(
    hit: &SearchHit,
    preferred: &BTreeSet<DocType>,
    terms: &[String],
    tuning: &RerankTuning,
) -> f32 {
    let mut score = hit.score;
    if preferred.contains(&hit.chunk.doc_type) {
        score += tuning.category_bonus;
    }
    let text = hit.chunk.text.to_lowercase();
    let present = terms.iter().filter(|t| text.contains(t.as_str())).count();
    score + (tuning.term_bonus * present as f32).min(tuning.term_bonus_cap)
}

/// Re-score, sort descending (stable), drop low-confidence hits, keep `k`.
/// An empty result is a normal outcome the caller must distinguish from
/// "nothing indexed".
pub fn rerank(
    hits: &[SearchHit],
    preferred: &BTreeSet<DocType>,
    terms: &[String],
    k: usize,
    tuning: &RerankTuning,
) -> Vec<SearchHit> {
    let mut scored: Vec<SearchHit> = hits
        .iter()
        .map(|h| SearchHit {
            chunk: h.chunk.clone(),
            score: adjusted_score(h, preferred, terms, tuning),
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.retain(|h| h.score >= tuning.min_score);
    scored.truncate(k);
    scored
}
