//! Optional natural-language generation capability.
//!
//! The composer treats generation as a pluggable capability that may be
//! absent; any fault from an implementation is caught by the caller and
//! answered with the extractive fallback instead. Implementations cross a
//! network boundary, so they return `Result` rather than panicking or
//! retrying internally.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use klubbsvar_core::{Error, Result};

/// System instruction for the chat model: short answers, Norwegian bokmål,
/// admit ignorance when the sources don't cover the question.
pub const SYSTEM_PROMPT: &str = "Du er en vennlig og hjelpsom assistent for Asker Fotball.\n\
    Svar kort (1–3 setninger) på norsk bokmål, med egne ord. \
    Hvis kildene ikke dekker spørsmålet, si 'Jeg vet ikke'.";

pub trait Generator: Send + Sync {
    /// Compose an answer from the question, supporting passages and prior
    /// conversation turns. The caller passes at most 5 passages and the
    /// last 3 turns.
    fn generate(
        &self,
        question: &str,
        passages: &[&str],
        history: &[(String, String)],
    ) -> Result<String>;
}

/// OpenAI-compatible chat-completions client.
pub struct ChatGenerator {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatGenerator {
    pub fn new(api_key: String, model: &str, base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Capability(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a generator from `OPENAI_API_KEY`; generation was explicitly
    /// enabled, so a missing key is a configuration error, not a silent
    /// downgrade.
    pub fn from_env(model: &str, base_url: &str) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            Error::Config(
                "generation is enabled but OPENAI_API_KEY is not set; \
                 add it to the environment or .env, or disable generation"
                    .to_string(),
            )
        })?;
        Self::new(api_key, model, base_url)
    }
}

impl Generator for ChatGenerator {
    fn generate(
        &self,
        question: &str,
        passages: &[&str],
        history: &[(String, String)],
    ) -> Result<String> {
        let context = passages
            .iter()
            .enumerate()
            .map(|(i, p)| format!("Utdrag {}:\n{}", i + 1, p))
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut messages = vec![ChatMessage {
            role: "system",
            content: SYSTEM_PROMPT.to_string(),
        }];
        for (user, assistant) in history {
            if !user.is_empty() {
                messages.push(ChatMessage {
                    role: "user",
                    content: user.clone(),
                });
            }
            if !assistant.is_empty() {
                messages.push(ChatMessage {
                    role: "assistant",
                    content: assistant.clone(),
                });
            }
        }
        messages.push(ChatMessage {
            role: "user",
            content: format!(
                "Spørsmål: {question}\n\nKontekst:\n{context}\n\n\
                 Instruks: Svar med egne ord i 1–3 setninger."
            ),
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: self.model.clone(),
                messages,
                temperature: 0.2,
                max_tokens: 150,
            })
            .send()
            .map_err(|e| Error::Capability(format!("chat request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::Capability(format!("chat API error {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| Error::Capability(format!("bad chat response: {e}")))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(text.trim().to_string())
    }
}
