//! Answer generation through a completion model.
//!
//! The query path renders a prompt from retrieved excerpts and hands it to a [`ChatClient`].
//! Answering is optional: without `CHAT_MODEL` no client is built and callers return the
//! retrieved documents alone.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced while generating an answer.
#[derive(Debug, Error)]
pub enum ChatClientError {
    /// Provider was unreachable or the endpoint is missing.
    #[error("Chat provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate answer: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by completion backends.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Complete `prompt` and return the trimmed answer text.
    async fn complete(&self, prompt: &str) -> Result<String, ChatClientError>;
}

/// Build a chat client when a completion model is configured.
pub fn get_chat_client(config: &Config) -> Result<Option<Box<dyn ChatClient>>, ChatClientError> {
    match config.chat_model.as_deref() {
        None => Ok(None),
        Some(model) => Ok(Some(Box::new(OllamaChatClient::new(
            config.ollama_url.clone(),
            model,
        )?))),
    }
}

/// Completion client for the Ollama `/api/generate` endpoint.
pub struct OllamaChatClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaChatClient {
    /// Construct a client for `model` served at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, ChatClientError> {
        let http = Client::builder()
            .user_agent("hugo-rag/chat")
            .build()
            .map_err(|error| ChatClientError::ProviderUnavailable(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl ChatClient for OllamaChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, ChatClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.1,
            }
        });

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Requesting answer");
        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                ChatClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ChatClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            ChatClientError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(ChatClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}
