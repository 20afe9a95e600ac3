//! Term-frequency/inverse-document-frequency vectorizer.
//!
//! Unigrams and bigrams over lowercased, accent-folded tokens, sublinear
//! term frequency, smoothed idf, L2-normalized rows. The fitted state
//! (vocabulary + idf weights) serializes alongside the vectors: a query
//! projected with a different vocabulary is meaningless, so the two always
//! travel together as one artifact.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// A row of the sparse matrix: parallel `indices`/`values`, indices strictly
/// ascending.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SparseVector {
    #[serde(rename = "i")]
    pub indices: Vec<u32>,
    #[serde(rename = "v")]
    pub values: Vec<f32>,
}

impl SparseVector {
    /// Inner product by merge-join over the sorted index lists. Since rows
    /// are L2-normalized this is cosine similarity.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let mut sum = 0.0f32;
        let (mut a, mut b) = (0usize, 0usize);
        while a < self.indices.len() && b < other.indices.len() {
            match self.indices[a].cmp(&other.indices[b]) {
                std::cmp::Ordering::Less => a += 1,
                std::cmp::Ordering::Greater => b += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[a] * other.values[b];
                    a += 1;
                    b += 1;
                }
            }
        }
        sum
    }

    pub fn l2_normalize(&mut self) {
        let norm: f32 = self.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfSettings {
    /// Longest n-gram emitted; 2 means unigrams + bigrams.
    pub ngram_max: usize,
    /// Terms present in more than this fraction of documents are dropped.
    pub max_df: f64,
    /// Vocabulary cap; kept terms are the most frequent in the corpus.
    pub max_features: usize,
    /// Use `1 + ln(tf)` instead of raw counts.
    pub sublinear_tf: bool,
}

impl Default for TfidfSettings {
    fn default() -> Self {
        Self {
            ngram_max: 2,
            max_df: 0.95,
            max_features: 60_000,
            sublinear_tf: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    settings: TfidfSettings,
    vocabulary: HashMap<String, u32>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Fit vocabulary and idf weights over the corpus. An empty corpus (or
    /// one where pruning removes every term) produces an empty vocabulary;
    /// every projection through it is the zero vector.
    pub fn fit<S: AsRef<str>>(texts: &[S], settings: TfidfSettings) -> Self {
        let n_docs = texts.len();
        let mut df: HashMap<String, usize> = HashMap::new();
        let mut corpus_count: HashMap<String, u64> = HashMap::new();

        for text in texts {
            let mut seen_in_doc: HashMap<String, u64> = HashMap::new();
            for term in terms_of(text.as_ref(), settings.ngram_max) {
                *seen_in_doc.entry(term).or_insert(0) += 1;
            }
            for (term, count) in seen_in_doc {
                *corpus_count.entry(term.clone()).or_insert(0) += count;
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let df_cap = (settings.max_df * n_docs as f64).floor() as usize;
        let mut kept: Vec<&String> = df
            .iter()
            .filter(|(_, &d)| n_docs == 0 || d <= df_cap.max(1))
            .map(|(t, _)| t)
            .collect();

        if kept.len() > settings.max_features {
            kept.sort_by(|a, b| {
                corpus_count[*b]
                    .cmp(&corpus_count[*a])
                    .then_with(|| a.cmp(b))
            });
            kept.truncate(settings.max_features);
        }
        kept.sort();

        let mut vocabulary = HashMap::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (i, term) in kept.into_iter().enumerate() {
            let d = df[term];
            let weight = (((1 + n_docs) as f64 / (1 + d) as f64).ln() + 1.0) as f32;
            vocabulary.insert(term.clone(), i as u32);
            idf.push(weight);
        }

        Self {
            settings,
            vocabulary,
            idf,
        }
    }

    /// Project a text into the fitted feature space. Out-of-vocabulary
    /// terms are ignored; a text with no known terms maps to the zero
    /// vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<u32, f64> = HashMap::new();
        for term in terms_of(text, self.settings.ngram_max) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        let mut entries: Vec<(u32, f32)> = counts
            .into_iter()
            .map(|(idx, count)| {
                let tf = if self.settings.sublinear_tf {
                    1.0 + count.ln()
                } else {
                    count
                };
                (idx, (tf * self.idf[idx as usize] as f64) as f32)
            })
            .collect();
        entries.sort_by_key(|&(idx, _)| idx);

        let mut vector = SparseVector {
            indices: entries.iter().map(|&(i, _)| i).collect(),
            values: entries.iter().map(|&(_, v)| v).collect(),
        };
        vector.l2_normalize();
        vector
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Lowercase, strip accents (NFKD, combining marks removed), split into
/// runs of word characters, keep tokens of 2+ chars, then emit unigrams and
/// joined n-grams up to `ngram_max`.
fn terms_of(text: &str, ngram_max: usize) -> Vec<String> {
    let tokens = tokenize(text);
    let mut terms = Vec::with_capacity(tokens.len() * ngram_max.max(1));
    for n in 1..=ngram_max.max(1) {
        if tokens.len() < n {
            break;
        }
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}

fn tokenize(text: &str) -> Vec<String> {
    let folded: String = text
        .to_lowercase()
        .nfkd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect();
    folded
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}
