//! Stage 1: Classify (§4.6). One fast-tier LLM call, strict schema, no
//! persistence. Raw text is truncated to a prompt-safe prefix beforehand so
//! a multi-megabyte paste never blows the context window.

use serde::{Deserialize, Serialize};

use crate::broadcast::BroadcastAdapter;
use crate::config::Config;
use crate::ingest::schema;
use crate::llm::client::{ChatMessage, LlmClient};
use crate::llm::retry::{call_with_retry, RetryRequest};
use crate::persistence::PersistenceLayer;
use crate::types::{AttemptStatus, HierarchyLevel, ScenarioId};

/// Prompt-safe prefix length (characters) for raw ingest text (§4.6).
const MAX_PROMPT_CHARS: usize = 12_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResult {
    pub hierarchy_level: String,
    pub document_type: String,
    pub source_format: String,
    pub confidence: f64,
    pub title: String,
    pub issuing_authority: Option<String>,
    pub effective_date_str: Option<String>,
}

impl ClassifyResult {
    pub fn hierarchy(&self) -> HierarchyLevel {
        match self.hierarchy_level.as_str() {
            "STRATEGY" => HierarchyLevel::Strategy,
            "PLANNING" => HierarchyLevel::Planning,
            "ORDER" => HierarchyLevel::Order,
            _ => HierarchyLevel::EventList,
        }
    }
}

fn truncate_prompt_safe(text: &str) -> &str {
    if text.len() <= MAX_PROMPT_CHARS {
        return text;
    }
    // Truncate on a char boundary so we never split a multi-byte UTF-8 codepoint.
    let mut end = MAX_PROMPT_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub async fn classify(
    client: &dyn LlmClient,
    persistence: &dyn PersistenceLayer,
    broadcast: &BroadcastAdapter,
    config: &Config,
    scenario_id: ScenarioId,
    raw_text: &str,
    source_hint: Option<&str>,
) -> Option<ClassifyResult> {
    let prefix = truncate_prompt_safe(raw_text);

    let mut user_prompt = String::from(
        "Classify the following military planning document. Determine its hierarchy level \
         (STRATEGY, PLANNING, ORDER, or EVENT_LIST), its specific document type, source format, \
         title, issuing authority, and effective date if stated.\n\n",
    );
    if let Some(hint) = source_hint {
        user_prompt.push_str(&format!("Source hint: {hint}\n\n"));
    }
    user_prompt.push_str("Document text:\n");
    user_prompt.push_str(prefix);

    let outcome = call_with_retry(
        client,
        persistence,
        broadcast,
        RetryRequest {
            model: config.llm_fast.clone(),
            messages: vec![
                ChatMessage::system(
                    "You are a military document classification assistant. Respond only with \
                     the requested structured JSON.",
                ),
                ChatMessage::user(user_prompt),
            ],
            max_tokens: 1_000,
            reasoning_effort: None,
            schema: Some(schema::classify_schema()),
            min_output_length: 20,
            max_retries: 2,
            scenario_id,
            step: "Ingest",
            artifact: "classification",
        },
    )
    .await;

    if outcome.status == AttemptStatus::Error {
        return None;
    }

    serde_json::from_str(&outcome.content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "a".repeat(MAX_PROMPT_CHARS + 500) + "\u{1F680}";
        let truncated = truncate_prompt_safe(&text);
        assert!(truncated.len() <= MAX_PROMPT_CHARS);
        assert!(std::str::from_utf8(truncated.as_bytes()).is_ok());
    }

    #[test]
    fn short_text_is_returned_unchanged() {
        let text = "MEMORANDUM FOR RECORD";
        assert_eq!(truncate_prompt_safe(text), text);
    }
}
