//! Corpus loading: walk a knowledge directory, normalize documents and cut
//! them into indexable [`Chunk`]s.
//!
//! Two input shapes are supported:
//! - `*.md` / `*.txt` documents: code fences stripped, whitespace collapsed,
//!   title taken from the first heading, then chunked with overlapping
//!   windows.
//! - `*.jsonl` files of pre-chunked records (`{"text": ..., "metadata":
//!   {...}}`), one chunk per line; malformed lines are skipped.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::chunk::{chunk_text, ChunkingConfig};
use crate::types::{Chunk, DocType};
use crate::Result;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*#\s+(.+)$").expect("static regex"));

/// Remove code fences and collapse runs of whitespace.
pub fn strip_noise(text: &str) -> String {
    let no_fences = CODE_FENCE.replace_all(text, " ");
    WHITESPACE.replace_all(&no_fences, " ").trim().to_string()
}

/// First `# heading` of a markdown document, else the first non-empty line
/// (capped at 120 chars), else the fallback.
pub fn title_of(raw: &str, fallback: &str) -> String {
    if let Some(m) = HEADING.captures(raw) {
        return m[1].trim().to_string();
    }
    for line in raw.lines() {
        let s = line.trim();
        if !s.is_empty() {
            return s.chars().take(120).collect();
        }
    }
    fallback.to_string()
}

#[derive(Debug, Deserialize, Default)]
struct RecordMeta {
    source: Option<String>,
    title: Option<String>,
    doc_type: Option<String>,
    version_date: Option<String>,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(default)]
    text: String,
    #[serde(default)]
    metadata: RecordMeta,
}

fn doc_type_from_str(s: &str) -> Option<DocType> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).ok()
}

fn slashes(p: &Path) -> String {
    p.to_string_lossy().replace('\\', "/")
}

/// Loads a knowledge directory into chunks. Holds the chunking parameters;
/// everything else about a run is derived from the files themselves.
#[derive(Debug, Default)]
pub struct CorpusLoader {
    chunking: ChunkingConfig,
}

impl CorpusLoader {
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self { chunking }
    }

    /// Walk `kb_dir` and return all chunks in deterministic (sorted-path,
    /// in-file) order. A missing or empty directory yields an empty corpus,
    /// not an error — the caller decides whether that is worth reporting.
    pub fn load_dir(&self, kb_dir: &Path) -> Result<Vec<Chunk>> {
        self.chunking.validate()?;
        let files = list_source_files(kb_dir);
        if files.is_empty() {
            tracing::warn!(dir = %kb_dir.display(), "no source documents found");
            return Ok(Vec::new());
        }
        let mut chunks = Vec::new();
        for path in &files {
            match path.extension().and_then(|s| s.to_str()) {
                Some("jsonl") => self.load_records(path, &mut chunks)?,
                _ => self.load_document(path, &mut chunks)?,
            }
        }
        tracing::info!(files = files.len(), chunks = chunks.len(), "corpus loaded");
        Ok(chunks)
    }

    fn load_document(&self, path: &Path, out: &mut Vec<Chunk>) -> Result<()> {
        let raw = read_text(path)?;
        let clean = strip_noise(&raw);
        if clean.is_empty() {
            return Ok(());
        }
        let source = slashes(path);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().replace(['-', '_'], " "))
            .unwrap_or_default();
        let title = title_of(&raw, &stem);
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let doc_type = DocType::infer(&file_name, &clean);
        for (ci, text) in chunk_text(&clean, self.chunking.window, self.chunking.overlap)
            .into_iter()
            .enumerate()
        {
            out.push(Chunk {
                id: format!("{}#{}", source, ci),
                text,
                source: source.clone(),
                title: title.clone(),
                doc_type,
                chunk_index: ci,
                version_date: None,
                page: None,
            });
        }
        Ok(())
    }

    fn load_records(&self, path: &Path, out: &mut Vec<Chunk>) -> Result<()> {
        let raw = read_text(path)?;
        let file_source = slashes(path);
        let mut ci = 0usize;
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: Record = match serde_json::from_str(line) {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!(file = %file_source, error = %e, "skipping malformed record");
                    continue;
                }
            };
            let text = strip_noise(&record.text);
            if text.is_empty() {
                continue;
            }
            let meta = record.metadata;
            let source = meta
                .source
                .map(|s| s.replace('\\', "/"))
                .unwrap_or_else(|| file_source.clone());
            let fallback = Path::new(&source)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let title = meta
                .title
                .unwrap_or_else(|| title_of(&record.text, &fallback));
            let doc_type = meta
                .doc_type
                .as_deref()
                .and_then(doc_type_from_str)
                .unwrap_or_else(|| DocType::infer(&title, &text));
            out.push(Chunk {
                id: format!("{}#{}", source, ci),
                text,
                source,
                title,
                doc_type,
                chunk_index: ci,
                version_date: meta.version_date,
                page: meta.page,
            });
            ci += 1;
        }
        Ok(())
    }
}

fn read_text(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
    }
}

fn list_source_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|s| s.to_str()),
                Some("md" | "txt" | "jsonl")
            )
        })
        .collect();
    files.sort();
    files
}
