use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the retrieval pipeline.
///
/// Only `Config` and `IndexCorrupt` stop the pipeline; everything else is
/// either recoverable (`IndexMissing` triggers a rebuild) or degraded
/// locally (`Capability` falls back to the next-cheaper strategy).
#[derive(Debug, Error)]
pub enum Error {
    /// A required setting or credential is missing or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Index artifacts have not been built yet.
    #[error("index not built: no artifacts at {path}; run the indexer")]
    IndexMissing { path: PathBuf },

    /// Index artifacts are present but inconsistent. Requires a rebuild;
    /// partial recovery would return wrong scores.
    #[error("index corrupt: {0}; rebuild the index")]
    IndexCorrupt(String),

    /// An external capability (embedding or generation) failed or is not
    /// configured. Callers recover by falling back, never by retrying here.
    #[error("capability unavailable: {0}")]
    Capability(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
