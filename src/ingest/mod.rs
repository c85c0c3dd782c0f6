//! Document Ingest Pipeline (§4.6) — three pure stages composed by
//! `ingest()`: classify -> normalize -> link & persist. All-or-nothing
//! (§7): a classification or normalization failure aborts the run with an
//! `ingest:error` broadcast and no persisted document; only a successful
//! link-and-persist reaches the database.

pub mod classify;
pub mod dtg;
pub mod enum_normalize;
pub mod link_persist;
pub mod normalize;
pub mod schema;

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::broadcast::{BroadcastAdapter, Event};
use crate::config::Config;
use crate::llm::client::LlmClient;
use crate::persistence::{PersistenceError, PersistenceLayer};
use crate::types::{HierarchyLevel, IngestLog, IngestLogId, ScenarioId};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("classification produced no usable output")]
    ClassificationFailed,
    #[error("normalization produced no usable output")]
    NormalizationFailed,
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Clone)]
pub struct IngestResult {
    pub ingest_id: Uuid,
    pub hierarchy_level: HierarchyLevel,
    pub document_type: String,
    pub parent_link_id: Option<Uuid>,
    pub entity_count: i32,
    pub review_flag_count: i32,
}

fn input_hash(raw_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Run the full three-stage pipeline over `raw_text` and persist the result
/// (§4.6). `source_hint` is an optional caller-supplied document-type hint
/// (e.g. "ATO" when the Game Master is routing its own generated text back
/// through ingest) that the classify stage folds into its prompt.
pub async fn ingest(
    client: &dyn LlmClient,
    persistence: &dyn PersistenceLayer,
    broadcast: &BroadcastAdapter,
    config: &Config,
    scenario_id: ScenarioId,
    raw_text: &str,
    source_hint: Option<&str>,
) -> Result<IngestResult, IngestError> {
    let ingest_id = Uuid::new_v4();
    let started = std::time::Instant::now();

    broadcast.emit(scenario_id, Event::IngestStarted { ingest_id });

    let classification = classify::classify(
        client,
        persistence,
        broadcast,
        config,
        scenario_id,
        raw_text,
        source_hint,
    )
    .await
    .ok_or(IngestError::ClassificationFailed);

    let classification = match classification {
        Ok(c) => c,
        Err(err) => {
            broadcast.emit(
                scenario_id,
                Event::IngestError { ingest_id, error: err.to_string() },
            );
            return Err(err);
        }
    };

    broadcast.emit(
        scenario_id,
        Event::IngestClassified {
            ingest_id,
            hierarchy_level: classification.hierarchy_level.clone(),
            document_type: classification.document_type.clone(),
        },
    );

    let normalized = normalize::normalize(
        client,
        persistence,
        broadcast,
        config,
        scenario_id,
        raw_text,
        &classification,
    )
    .await
    .ok_or(IngestError::NormalizationFailed);

    let normalized = match normalized {
        Ok(n) => n,
        Err(err) => {
            broadcast.emit(
                scenario_id,
                Event::IngestError { ingest_id, error: err.to_string() },
            );
            return Err(err);
        }
    };

    let scenario = persistence.get_scenario(scenario_id).await?;

    let entity_count_preview = match &normalized {
        normalize::Normalized::Order(o) => {
            o.packages.iter().map(|p| p.missions.len()).sum::<usize>() as i32
        }
        _ => 0,
    };
    broadcast.emit(
        scenario_id,
        Event::IngestNormalized { ingest_id, entity_count: entity_count_preview },
    );

    let link_result = link_persist::link_and_persist(
        persistence,
        scenario_id,
        scenario.start_date,
        normalized,
    )
    .await?;

    let parse_time_ms = started.elapsed().as_millis() as i64;
    let log = IngestLog {
        id: IngestLogId::new(),
        scenario_id,
        input_hash: input_hash(raw_text),
        hierarchy_level: classification.hierarchy_level.clone(),
        document_type: classification.document_type.clone(),
        parent_link_id: link_result.parent_link_id,
        entity_count: link_result.entity_count,
        review_flag_count: link_result.review_flag_count,
        parse_time_ms,
        created_at: Utc::now(),
    };
    persistence.append_ingest_log(&log).await?;

    broadcast.emit(
        scenario_id,
        Event::IngestComplete {
            ingest_id,
            parent_link_id: link_result.parent_link_id,
            review_flag_count: link_result.review_flag_count,
            parse_time_ms,
        },
    );

    Ok(IngestResult {
        ingest_id,
        hierarchy_level: classification.hierarchy(),
        document_type: classification.document_type,
        parent_link_id: link_result.parent_link_id,
        entity_count: link_result.entity_count,
        review_flag_count: link_result.review_flag_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_hash_is_deterministic() {
        let a = input_hash("MEMORANDUM FOR RECORD");
        let b = input_hash("MEMORANDUM FOR RECORD");
        assert_eq!(a, b);
    }

    #[test]
    fn input_hash_differs_for_different_input() {
        let a = input_hash("document one");
        let b = input_hash("document two");
        assert_ne!(a, b);
    }
}
