//! Overlapping fixed-size text windows.
//!
//! Chunks are measured in characters, not bytes, so window and overlap mean
//! the same thing regardless of how much of the corpus is non-ASCII.

use crate::{Error, Result};

/// Window/overlap pair used when slicing documents.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub window: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window: 700,
            overlap: 120,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(Error::Config("chunk window must be > 0".to_string()));
        }
        if self.overlap >= self.window {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be smaller than the window ({})",
                self.overlap, self.window
            )));
        }
        Ok(())
    }
}

/// Split `text` into consecutive windows of `window` characters, each
/// overlapping the previous one by `overlap` characters. The final window
/// may be shorter. Empty input yields no chunks.
///
/// Requires `overlap < window` (see [`ChunkingConfig::validate`]); callers
/// pass validated values.
pub fn chunk_text(text: &str, window: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the string, so
    // char-indexed windows can slice without walking the text repeatedly.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    let n = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + window).min(n);
        chunks.push(text[bounds[start]..bounds[end]].to_string());
        if end == n {
            break;
        }
        start = end.saturating_sub(overlap);
    }
    chunks
}
