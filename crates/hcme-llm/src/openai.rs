//! OpenAI-compatible HTTP provider: the transport the Structured LLM
//! Executor's traits (`LlmProvider`/`EmbeddingProvider`, spec §6) are meant
//! to be plugged into via `Client::with_llm`/`with_embedder`. Targets the
//! `/chat/completions` and `/embeddings` shapes shared by OpenAI itself,
//! Azure OpenAI, and most local proxies, so `base_url` is swappable.

use std::time::Duration;

use async_trait::async_trait;
use hcme_providers::{EmbeddingProvider, Error, LlmProvider, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Non-streaming chat + embeddings client. One request per `generate`/
/// `embed_single` call; no retry or rate-limit backoff, since the Structured
/// LLM Executor already owns its own outer retry loop (spec §4.12).
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    embedding_model: String,
}

impl OpenAiProvider {
    /// Builds a client with the default 30s request timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }

    /// Reads the API key from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var("OPENAI_API_KEY").map_err(|_| Error::Llm("OPENAI_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Points the client at a proxy or Azure OpenAI deployment instead of
    /// the public API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, prompt: &str, request_id: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = build_chat_request(&self.chat_model, prompt);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Request-Id", request_id)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(map_http_status(status, &text, Error::Llm));
        }
        parse_chat_response(&text)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url);
        let body = build_embedding_request(&self.embedding_model, text);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(map_http_status(status, &text, Error::Embedding));
        }
        parse_embedding_response(&text)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Llm(err.to_string())
    }
}

fn map_http_status(status: reqwest::StatusCode, body: &str, wrap: fn(String) -> Error) -> Error {
    match status.as_u16() {
        401 | 403 => wrap(format!("authentication failed: {body}")),
        429 => wrap(format!("rate limited: {body}")),
        _ => wrap(format!("HTTP {status}: {body}")),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

fn build_chat_request<'a>(model: &'a str, prompt: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: [ChatMessage { role: "user", content: prompt }],
        stream: false,
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

fn parse_chat_response(body: &str) -> Result<String> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| Error::Llm(format!("invalid JSON response: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| Error::Llm("response had no message content".to_string()))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

fn build_embedding_request<'a>(model: &'a str, text: &'a str) -> EmbeddingRequest<'a> {
    EmbeddingRequest { model, input: text }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

fn parse_embedding_response(body: &str) -> Result<Vec<f32>> {
    let parsed: EmbeddingResponse =
        serde_json::from_str(body).map_err(|e| Error::Embedding(format!("invalid JSON response: {e}")))?;
    parsed
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| Error::Embedding("response had no embedding data".to_string()))
}
