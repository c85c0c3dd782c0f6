//! Bounded retry with escalating token budget (§4.4).
//!
//! `call_with_retry` is the only path any caller — ingest classify/normalize,
//! the Game Master, the Scenario Generator — takes to reach an `LlmClient`.
//! It owns the attempt loop, the best-of-N retention, the per-attempt
//! `GenerationLog` write, and the terminal `scenario:artifact-result`
//! broadcast, so every LLM call in the system gets identical audit and
//! progress behavior. Generalizes the teacher's `job_queue.rs` retry-count
//! bookkeeping (`retry_count < max_retries`) into an escalating-budget loop
//! that also keeps the best content seen, rather than only the latest.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::broadcast::{BroadcastAdapter, Event};
use crate::config::defaults::{RETRY_BACKOFF_BASE_MS, RETRY_TOKEN_ESCALATION};
use crate::llm::client::{ChatMessage, LlmClient, LlmRequest, ReasoningEffort};
use crate::persistence::PersistenceLayer;
use crate::types::{AttemptStatus, GenerationLog, GenerationLogId, ScenarioId};

/// One bounded-retry call (§4.4). `step`/`artifact` identify the call site
/// for the audit log and the broadcast event (e.g. step="Campaign Plan",
/// artifact="campaign_plan.md").
pub struct RetryRequest<'a> {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub schema: Option<serde_json::Value>,
    pub min_output_length: usize,
    pub max_retries: u32,
    pub scenario_id: ScenarioId,
    pub step: &'a str,
    pub artifact: &'a str,
}

#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub content: String,
    pub status: AttemptStatus,
    pub prompt_tokens: u32,
    pub output_tokens: u32,
    pub duration_ms: i64,
    pub retries: u32,
}

struct Best {
    content: String,
    prompt_tokens: u32,
    output_tokens: u32,
}

/// Run the bounded-retry loop against `client`, persisting one
/// `GenerationLog` row per attempt and broadcasting the terminal result.
/// Every log write and broadcast is best-effort (§4.4) — failures there
/// never change the returned outcome.
pub async fn call_with_retry(
    client: &dyn LlmClient,
    persistence: &dyn PersistenceLayer,
    broadcast: &BroadcastAdapter,
    request: RetryRequest<'_>,
) -> RetryOutcome {
    let started = std::time::Instant::now();
    let mut best: Option<Best> = None;
    let mut retries = 0u32;

    for attempt in 0..=request.max_retries {
        let token_budget = request.max_tokens + RETRY_TOKEN_ESCALATION * attempt;

        let llm_request = LlmRequest {
            model: request.model.clone(),
            messages: request.messages.clone(),
            max_tokens: token_budget,
            reasoning_effort: request.reasoning_effort,
            schema: request.schema.clone(),
        };

        match client.chat(llm_request).await {
            Ok(response) => {
                let is_best = best
                    .as_ref()
                    .map(|b| response.content.len() > b.content.len())
                    .unwrap_or(true);
                if is_best {
                    best = Some(Best {
                        content: response.content.clone(),
                        prompt_tokens: response.prompt_tokens,
                        output_tokens: response.completion_tokens,
                    });
                }

                if response.content.len() >= request.min_output_length {
                    let duration_ms = started.elapsed().as_millis() as i64;
                    let b = best.as_ref().expect("just set above");
                    log_attempt(
                        persistence,
                        &request,
                        attempt as i32,
                        AttemptStatus::Success,
                        Some(b.prompt_tokens as i32),
                        Some(b.output_tokens as i32),
                        b.content.len() as i32,
                        duration_ms,
                        None,
                    )
                    .await;
                    broadcast_result(
                        broadcast,
                        &request,
                        AttemptStatus::Success,
                        b.content.len(),
                        None,
                    );
                    return RetryOutcome {
                        content: b.content.clone(),
                        status: AttemptStatus::Success,
                        prompt_tokens: b.prompt_tokens,
                        output_tokens: b.output_tokens,
                        duration_ms,
                        retries,
                    };
                }

                warn!(
                    scenario_id = %request.scenario_id,
                    step = request.step,
                    artifact = request.artifact,
                    attempt,
                    output_length = response.content.len(),
                    min_output_length = request.min_output_length,
                    "LLM output below minimum length, will retry if attempts remain"
                );
            }
            Err(err) => {
                warn!(
                    scenario_id = %request.scenario_id,
                    step = request.step,
                    artifact = request.artifact,
                    attempt,
                    error = %err,
                    "LLM call failed"
                );
            }
        }

        if attempt < request.max_retries {
            retries += 1;
            log_attempt(
                persistence,
                &request,
                attempt as i32,
                AttemptStatus::Retry,
                None,
                None,
                0,
                started.elapsed().as_millis() as i64,
                None,
            )
            .await;
            let backoff_ms = RETRY_BACKOFF_BASE_MS * 2u64.pow(attempt);
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }
    }

    let duration_ms = started.elapsed().as_millis() as i64;
    let (content, status, prompt_tokens, output_tokens) = match best {
        Some(b) if !b.content.is_empty() => {
            (b.content, AttemptStatus::Placeholder, b.prompt_tokens, b.output_tokens)
        }
        _ => (String::new(), AttemptStatus::Error, 0, 0),
    };

    log_attempt(
        persistence,
        &request,
        request.max_retries as i32,
        status,
        Some(prompt_tokens as i32),
        Some(output_tokens as i32),
        content.len() as i32,
        duration_ms,
        if status == AttemptStatus::Error {
            Some("exhausted retries with no usable content".to_string())
        } else {
            Some("exhausted retries, returning best-of-N content".to_string())
        },
    )
    .await;
    broadcast_result(broadcast, &request, status, content.len(), None);

    RetryOutcome { content, status, prompt_tokens, output_tokens, duration_ms, retries }
}

#[allow(clippy::too_many_arguments)]
async fn log_attempt(
    persistence: &dyn PersistenceLayer,
    request: &RetryRequest<'_>,
    attempt: i32,
    status: AttemptStatus,
    prompt_tokens: Option<i32>,
    output_tokens: Option<i32>,
    output_length: i32,
    duration_ms: i64,
    message: Option<String>,
) {
    let log = GenerationLog {
        id: GenerationLogId::new(),
        scenario_id: request.scenario_id,
        step: request.step.to_string(),
        artifact: request.artifact.to_string(),
        attempt,
        status,
        prompt_tokens,
        output_tokens,
        output_length,
        duration_ms,
        message,
        created_at: Utc::now(),
    };

    // Best-effort: a failed audit write must never fail the LLM call itself.
    if let Err(err) = persistence.append_generation_log(&log).await {
        warn!(error = %err, "failed to persist generation log, continuing");
    } else {
        info!(
            scenario_id = %request.scenario_id,
            step = request.step,
            artifact = request.artifact,
            attempt,
            status = ?status,
            "generation log recorded"
        );
    }
}

/// §4.4: `retry` attempts are not broadcast, only terminal statuses.
fn broadcast_result(
    broadcast: &BroadcastAdapter,
    request: &RetryRequest<'_>,
    status: AttemptStatus,
    output_length: usize,
    message: Option<String>,
) {
    let artifact_status = match Option::<crate::types::ArtifactStatus>::from(status) {
        Some(s) => s,
        None => return,
    };

    broadcast.emit(
        request.scenario_id,
        Event::ArtifactResult {
            step: request.step.to_string(),
            artifact: request.artifact.to_string(),
            status: artifact_status,
            output_length,
            message,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::{LlmClientError, LlmResponse, Role};
    use crate::persistence::InMemoryPersistence;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedClient {
        responses: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn chat(&self, _request: LlmRequest) -> Result<LlmResponse, LlmClientError> {
            let mut responses = self.responses.lock().unwrap();
            let content = responses.remove(0).to_string();
            Ok(LlmResponse {
                content,
                prompt_tokens: 10,
                completion_tokens: 20,
                finish_reason: "stop".to_string(),
            })
        }
    }

    struct TokenBudgetRecordingClient {
        budgets: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl LlmClient for TokenBudgetRecordingClient {
        async fn chat(&self, request: LlmRequest) -> Result<LlmResponse, LlmClientError> {
            self.budgets.lock().unwrap().push(request.max_tokens);
            Ok(LlmResponse {
                content: "short".to_string(),
                prompt_tokens: 1,
                completion_tokens: 1,
                finish_reason: "stop".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn token_budget_escalates_by_4000_per_attempt() {
        let client = TokenBudgetRecordingClient { budgets: Mutex::new(Vec::new()) };
        let persistence = InMemoryPersistence::new();
        let broadcast = BroadcastAdapter::new();

        let _ = call_with_retry(
            &client,
            &persistence,
            &broadcast,
            RetryRequest {
                model: "test-model".to_string(),
                messages: vec![ChatMessage { role: Role::User, content: "hi".into() }],
                max_tokens: 8000,
                reasoning_effort: None,
                schema: None,
                min_output_length: 100_000,
                max_retries: 2,
                scenario_id: scenario_id(),
                step: "test-step",
                artifact: "test-artifact",
            },
        )
        .await;

        assert_eq!(*client.budgets.lock().unwrap(), vec![8000, 12000, 16000]);
    }

    fn scenario_id() -> ScenarioId {
        ScenarioId::new()
    }

    #[tokio::test]
    async fn best_of_n_retains_longest_content_as_placeholder() {
        let client = ScriptedClient {
            responses: Mutex::new(vec![
                &"x".repeat(30),
                &"x".repeat(50),
                &"x".repeat(20),
            ]),
        };
        let persistence = InMemoryPersistence::new();
        let broadcast = BroadcastAdapter::new();

        let outcome = call_with_retry(
            &client,
            &persistence,
            &broadcast,
            RetryRequest {
                model: "test-model".to_string(),
                messages: vec![ChatMessage { role: Role::User, content: "hi".into() }],
                max_tokens: 8000,
                reasoning_effort: None,
                schema: None,
                min_output_length: 100,
                max_retries: 2,
                scenario_id: scenario_id(),
                step: "test-step",
                artifact: "test-artifact",
            },
        )
        .await;

        assert_eq!(outcome.status, AttemptStatus::Placeholder);
        assert_eq!(outcome.content.len(), 50);
    }

    #[tokio::test]
    async fn success_returns_as_soon_as_minimum_is_met() {
        let client = ScriptedClient { responses: Mutex::new(vec![&"x".repeat(150)]) };
        let persistence = InMemoryPersistence::new();
        let broadcast = BroadcastAdapter::new();

        let outcome = call_with_retry(
            &client,
            &persistence,
            &broadcast,
            RetryRequest {
                model: "test-model".to_string(),
                messages: vec![ChatMessage { role: Role::User, content: "hi".into() }],
                max_tokens: 8000,
                reasoning_effort: None,
                schema: None,
                min_output_length: 100,
                max_retries: 2,
                scenario_id: scenario_id(),
                step: "test-step",
                artifact: "test-artifact",
            },
        )
        .await;

        assert_eq!(outcome.status, AttemptStatus::Success);
        assert_eq!(outcome.retries, 0);
    }
}
