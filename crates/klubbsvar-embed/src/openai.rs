//! OpenAI-compatible embeddings client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use klubbsvar_core::{Error, Result};

use crate::{l2_normalize, EmbedProvider};

const BATCH_SIZE: usize = 64;

pub struct OpenAiProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    base_url: String,
    dim: usize,
    id: String,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: &str, base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Capability(format!("failed to build http client: {e}")))?;
        let dim = match model {
            "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
            "text-embedding-3-large" => 3072,
            _ => 1536,
        };
        Ok(Self {
            client,
            api_key,
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            dim,
            id: format!("openai:{model}"),
        })
    }

    /// Build a provider from `OPENAI_API_KEY` in the environment.
    pub fn from_env(model: &str, base_url: &str) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            Error::Config(
                "OPENAI_API_KEY is not set; add it to the environment or .env, \
                 or set APP_USE_FAKE_EMBEDDINGS=1"
                    .to_string(),
            )
        })?;
        Self::new(api_key, model, base_url)
    }

    fn request(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                input: batch,
                model: &self.model,
            })
            .send()
            .map_err(|e| Error::Capability(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::Capability(format!(
                "embedding API error {status}: {body}"
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .map_err(|e| Error::Capability(format!("bad embedding response: {e}")))?;
        if parsed.data.len() != batch.len() {
            return Err(Error::Capability(format!(
                "embedding API returned {} vectors for {} inputs",
                parsed.data.len(),
                batch.len()
            )));
        }
        Ok(parsed
            .data
            .into_iter()
            .map(|row| {
                let mut v = row.embedding;
                l2_normalize(&mut v);
                v
            })
            .collect())
    }
}

impl EmbedProvider for OpenAiProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            out.extend(self.request(batch)?);
        }
        Ok(out)
    }
}
