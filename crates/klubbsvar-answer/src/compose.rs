//! Answer composition: expansion, retrieval, re-ranking and the fallback
//! chain, held together by the [`Asker`] handle the host process constructs
//! once and keeps for its lifetime.

use std::sync::{LazyLock, OnceLock};

use regex::Regex;

use klubbsvar_core::types::SearchHit;
use klubbsvar_core::{Error, Result};
use klubbsvar_index::{rank_hits, Searcher, VectorSpace};

use crate::expand::expand_query;
use crate::generate::Generator;
use crate::rerank::{rerank, RerankTuning};

/// Returned when no confident answer exists. Callers compare against this
/// to render the "no answer" state.
pub const DONT_KNOW: &str = "Jeg vet ikke";

const MAX_SENTENCE_CHARS: usize = 280;
const CONTEXT_PASSAGES: usize = 5;
const HISTORY_TURNS: usize = 3;

static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+?[.!?])\s").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// First complete sentence (terminated by `.`, `!` or `?`) of `text`,
/// capped at 280 chars. Falls back to the whole (capped) text when no
/// terminator is found.
pub fn first_sentence(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ").to_string();
    let padded = format!("{collapsed} ");
    let sentence = SENTENCE
        .captures(&padded)
        .map_or(collapsed, |c| c[1].to_string());
    sentence.chars().take(MAX_SENTENCE_CHARS).collect()
}

fn extractive(hits: &[SearchHit]) -> String {
    let Some(top) = hits.first() else {
        return DONT_KNOW.to_string();
    };
    let sentence = first_sentence(&top.chunk.text);
    if sentence.is_empty() {
        DONT_KNOW.to_string()
    } else {
        sentence
    }
}

/// The query-side engine: a loaded index plus tuning and the optional
/// generation capability. Stateless across calls — conversation history is
/// passed in explicitly by the caller.
pub struct Asker {
    searcher: Searcher,
    tuning: RerankTuning,
    generator: Option<Box<dyn Generator>>,
    /// Lexical space fit on demand the first time the dense provider fails
    /// at query time; reused for the life of this handle.
    lexical_fallback: OnceLock<VectorSpace>,
}

impl Asker {
    pub fn new(searcher: Searcher) -> Self {
        Self {
            searcher,
            tuning: RerankTuning::default(),
            generator: None,
            lexical_fallback: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_tuning(mut self, tuning: RerankTuning) -> Self {
        self.tuning = tuning;
        self
    }

    #[must_use]
    pub fn with_generator(mut self, generator: Box<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Answer `query` with up to `k` cited sources.
    ///
    /// Never fails because of the generation capability: generation faults
    /// degrade to extraction, and no confident hits degrade to the
    /// [`DONT_KNOW`] sentinel paired with the raw (pre-filter) hits so the
    /// caller can still show what was found.
    pub fn answer(
        &self,
        query: &str,
        k: usize,
        history: &[(String, String)],
    ) -> Result<(String, Vec<SearchHit>)> {
        let expansion = expand_query(query);
        // Over-fetch so the re-ranker has material to filter.
        let raw = self.retrieve(&expansion.query, (2 * k).max(6))?;
        let hits = rerank(&raw, &expansion.preferred, &expansion.terms, k, &self.tuning);

        if hits.is_empty() {
            let shown: Vec<SearchHit> = raw.into_iter().take(k).collect();
            return Ok((DONT_KNOW.to_string(), shown));
        }

        let mut text = self.compose(query, &hits, history);
        if text.split_whitespace().count() < 2 {
            text = DONT_KNOW.to_string();
        }
        Ok((text, hits))
    }

    /// Ordered retrieval attempts: the active space first, then — only when
    /// the embedding capability fails mid-query — a lexical space fit over
    /// the already-loaded chunks.
    fn retrieve(&self, query: &str, n: usize) -> Result<Vec<SearchHit>> {
        match self.searcher.search(query, n) {
            Ok(hits) => Ok(hits),
            Err(Error::Capability(reason)) => {
                tracing::warn!(%reason, "embedding unavailable; searching a lexical space instead");
                let space = match self.lexical_fallback.get() {
                    Some(space) => space,
                    None => {
                        let built = VectorSpace::fit_sparse(self.searcher.chunks());
                        self.lexical_fallback.get_or_init(|| built)
                    }
                };
                let scores = space.score_all(query)?;
                Ok(rank_hits(&scores, self.searcher.chunks(), n))
            }
            Err(e) => Err(e),
        }
    }

    fn compose(&self, query: &str, hits: &[SearchHit], history: &[(String, String)]) -> String {
        let Some(generator) = &self.generator else {
            return extractive(hits);
        };
        let passages: Vec<&str> = hits
            .iter()
            .take(CONTEXT_PASSAGES)
            .map(|h| h.chunk.text.as_str())
            .collect();
        let recent = &history[history.len().saturating_sub(HISTORY_TURNS)..];
        match generator.generate(query, &passages, recent) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => extractive(hits),
            Err(e) => {
                tracing::warn!(error = %e, "generation failed; extracting instead");
                extractive(hits)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sentence_stops_at_terminator() {
        assert_eq!(
            first_sentence("Et sesongkort koster 1500 kroner. Kjøp på nett."),
            "Et sesongkort koster 1500 kroner."
        );
        assert_eq!(first_sentence("Åpent i dag! Velkommen."), "Åpent i dag!");
    }

    #[test]
    fn first_sentence_collapses_whitespace() {
        assert_eq!(
            first_sentence("Kampen  starter\n\nklokka 18. Mer info senere."),
            "Kampen starter klokka 18."
        );
    }

    #[test]
    fn first_sentence_without_terminator_returns_text() {
        assert_eq!(first_sentence("bare en frase uten punktum"), "bare en frase uten punktum");
    }

    #[test]
    fn first_sentence_caps_length() {
        let long = format!("{}.", "a".repeat(400));
        assert_eq!(first_sentence(&long).chars().count(), MAX_SENTENCE_CHARS);
    }

    #[test]
    fn extractive_of_nothing_is_dont_know() {
        assert_eq!(extractive(&[]), DONT_KNOW);
    }
}
