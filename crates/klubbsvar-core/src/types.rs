//! Domain types shared by the index, search and answer layers.

use serde::{Deserialize, Serialize};

/// Coarse topical category of a source document.
///
/// Assigned once at ingestion by [`DocType::infer`](crate::classify) and used
/// by the re-ranker to boost hits matching the query's topic. Serialized into
/// `meta.jsonl`, so the variant names are part of the artifact format.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Ticketing,
    Schedule,
    Contact,
    Community,
    History,
    Venue,
    Roster,
    Sponsorship,
    Activities,
    #[default]
    Unknown,
}

impl DocType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocType::Ticketing => "ticketing",
            DocType::Schedule => "schedule",
            DocType::Contact => "contact",
            DocType::Community => "community",
            DocType::History => "history",
            DocType::Venue => "venue",
            DocType::Roster => "roster",
            DocType::Sponsorship => "sponsorship",
            DocType::Activities => "activities",
            DocType::Unknown => "unknown",
        }
    }
}

/// A contiguous, overlap-bounded slice of a source document.
///
/// The atomic unit of indexing and retrieval. One record per row of the
/// vector matrix; row order in `meta.jsonl` must match the vector file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `"{source}#{chunk_index}"` — stable across rebuilds of the same corpus.
    pub id: String,
    /// Whitespace-normalized, code-fence-stripped content.
    pub text: String,
    /// Path (forward slashes) or URL of the originating document.
    pub source: String,
    /// First heading of the document, or derived from the filename.
    pub title: String,
    #[serde(default)]
    pub doc_type: DocType,
    /// Zero-based position within the source document.
    pub chunk_index: usize,
    #[serde(default)]
    pub version_date: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
}

/// A chunk paired with a similarity score. Produced per query, never
/// persisted; the score starts as raw cosine similarity and is replaced by
/// the blended score during re-ranking.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub score: f32,
}
