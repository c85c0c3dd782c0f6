//! LLM client trait + Retry/Logger (§4.4).
//!
//! `LlmClient` is the external collaborator contract (the chat-completions
//! endpoint named in §6). `retry` is the bounded-retry-with-escalating-budget
//! wrapper every caller (ingest classify/normalize, Game Master, Scenario
//! Generator) goes through — never `LlmClient` directly — so every LLM call
//! in the system gets the same audit trail and broadcast behavior.

pub mod client;
pub mod retry;

pub use client::{ChatMessage, LlmClient, LlmClientError, LlmRequest, LlmResponse, ReasoningEffort, Role};
pub use retry::{call_with_retry, RetryOutcome, RetryRequest};
