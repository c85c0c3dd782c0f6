//! `LlmClient` — the external chat-completions endpoint contract (§6).
//!
//! Out of scope per spec.md §1: the endpoint itself is an external
//! collaborator. This module only defines the trait the rest of the system
//! depends on (so tests inject a fake, mirroring the teacher's
//! `PersistenceLayer` trait-object pattern in `storage/persistence.rs`) plus
//! one real implementation over `reqwest`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

/// A strict JSON schema request. `schema` is handed to the endpoint's
/// `response_format` verbatim — callers build it with `serde_json::json!`
/// per call site (classify/normalize schemas live in `ingest::schema`).
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub finish_reason: String,
}

#[derive(Debug, Error)]
pub enum LlmClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("endpoint returned status {0}: {1}")]
    Status(u16, String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse, LlmClientError>;
}

/// `reqwest`-backed client over an OpenAI-compatible chat-completions
/// endpoint (§6: `response_format` strict JSON schema, `max_completion_tokens`,
/// optional `reasoning_effort`, `usage.completion_tokens_details.reasoning_tokens`).
pub struct HttpLlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpLlmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .build()
                .expect("failed to build reqwest client"),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: String,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse, LlmClientError> {
        let response_format = request.schema.map(|schema| {
            serde_json::json!({
                "type": "json_schema",
                "json_schema": { "name": "structured_output", "strict": true, "schema": schema },
            })
        });

        let body = ChatCompletionsRequest {
            model: &request.model,
            messages: &request.messages,
            max_completion_tokens: request.max_tokens,
            reasoning_effort: request.reasoning_effort,
            response_format,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmClientError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmClientError::Status(status.as_u16(), text));
        }

        let parsed: ChatCompletionsResponse = resp
            .json()
            .await
            .map_err(|e| LlmClientError::Malformed(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmClientError::Malformed("no choices in response".to_string()))?;

        Ok(LlmResponse {
            content: choice.message.content,
            prompt_tokens: parsed.usage.prompt_tokens,
            completion_tokens: parsed.usage.completion_tokens,
            finish_reason: choice.finish_reason,
        })
    }
}
