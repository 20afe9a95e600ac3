//! Embedding providers for the dense vector space.
//!
//! Implementations either call a remote API (`openai.rs`) or compute a cheap
//! deterministic vector locally (`fake.rs`, for tests and development).
//! Providers must return L2-normalized vectors of a fixed dimensionality for
//! a given `id()`; the id is recorded in the index manifest so queries can
//! only be embedded by the same provider that built the index.

use klubbsvar_core::Result;

pub trait EmbedProvider: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `openai:text-embedding-3-small`).
    fn id(&self) -> &str;
    /// Embedding dimensionality.
    fn dim(&self) -> usize;
    /// Compute L2-normalized embeddings for a batch of input texts.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

mod fake;
mod openai;

pub use fake::FakeProvider;
pub use openai::OpenAiProvider;

use klubbsvar_core::config::env_flag;

/// Construct the configured provider.
///
/// Respects `APP_USE_FAKE_EMBEDDINGS=1` to switch to the deterministic fake
/// for fast offline runs; otherwise builds the remote provider, which needs
/// `OPENAI_API_KEY` in the environment.
pub fn default_provider(model: &str, base_url: &str) -> Result<Box<dyn EmbedProvider>> {
    if env_flag("APP_USE_FAKE_EMBEDDINGS", false) {
        return Ok(Box::new(FakeProvider::default()));
    }
    Ok(Box::new(OpenAiProvider::from_env(model, base_url)?))
}

/// Scale `v` to unit length. A zero vector is left untouched and scores
/// zero against everything.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
