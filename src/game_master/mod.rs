//! Game Master (§4.8) — the three on-demand LLM-driven operations that
//! close the simulation's world-state loop: `generate_ato`, `generate_inject`,
//! `assess_bda`, plus `generate_maap`. Shaped as one async orchestrator over
//! `dyn PersistenceLayer` + the LLM Retry/Logger + the Broadcast Adapter, the
//! same collaborator set `pipeline::coordinator::PipelineCoordinator` holds
//! in the teacher, sequencing phases with `tracing` spans at each boundary.
//!
//! Exposed as a trait (`GameMaster`) so the Simulation Engine's day-boundary
//! cycle depends on the abstraction rather than a concrete LLM-backed
//! struct — the same dependency-inversion shape as `PersistenceLayer`.

mod context;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::allocation::{self, AnnotatedNeed};
use crate::broadcast::{BroadcastAdapter, Event};
use crate::config::Config;
use crate::ingest::{self, IngestError};
use crate::llm::client::{ChatMessage, LlmClient};
use crate::llm::retry::{call_with_retry, RetryRequest};
use crate::persistence::{PersistenceError, PersistenceLayer};
use crate::types::{AssetStatus, PlanningDocId, PlanningDocType, PriorityEntry, RiskLevel, ScenarioId};

pub use context::{build_context_packet, ContextPacket};

#[derive(Debug, Error)]
pub enum GameMasterError {
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("ingest of generated document failed: {0}")]
    Ingest(#[from] IngestError),
    #[error("LLM produced no usable structured output for {0}")]
    NoUsableOutput(&'static str),
}

#[derive(Debug, Clone)]
pub struct GameMasterOutcome {
    pub created_id: Uuid,
    pub duration_ms: i64,
}

#[async_trait]
pub trait GameMaster: Send + Sync {
    async fn generate_ato(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<GameMasterOutcome, GameMasterError>;

    async fn generate_inject(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<GameMasterOutcome, GameMasterError>;

    async fn assess_bda(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<GameMasterOutcome, GameMasterError>;

    async fn generate_maap(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<GameMasterOutcome, GameMasterError>;
}

/// Per-target BDA extraction (§4.8).
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetAssessment {
    target_name: String,
    damage_percent: f64,
    functional_kill: bool,
    restrike_needed: bool,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct BdaExtraction {
    assessments: Vec<TargetAssessment>,
}

fn bda_extraction_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "assessments": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "targetName": { "type": "string" },
                        "damagePercent": { "type": "number" },
                        "functionalKill": { "type": "boolean" },
                        "restrikeNeeded": { "type": "boolean" },
                    },
                    "required": ["targetName", "damagePercent", "functionalKill", "restrikeNeeded"],
                }
            }
        },
        "required": ["assessments"],
    })
}

/// LLM-backed `GameMaster` implementation. Holds the same collaborator set
/// as every other orchestrator in this crate — no database pool, no HTTP
/// client directly; everything goes through the trait objects.
pub struct LlmGameMaster<'a> {
    pub client: &'a dyn LlmClient,
    pub persistence: &'a dyn PersistenceLayer,
    pub broadcast: &'a BroadcastAdapter,
    pub config: &'a Config,
}

impl<'a> LlmGameMaster<'a> {
    pub fn new(
        client: &'a dyn LlmClient,
        persistence: &'a dyn PersistenceLayer,
        broadcast: &'a BroadcastAdapter,
        config: &'a Config,
    ) -> Self {
        Self { client, persistence, broadcast, config }
    }

    async fn run_document_op(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
        op_name: &'static str,
        step: &'static str,
        system_prompt: &str,
        user_prompt: String,
        source_hint: &str,
    ) -> Result<GameMasterOutcome, GameMasterError> {
        let started = std::time::Instant::now();

        let outcome = call_with_retry(
            self.client,
            self.persistence,
            self.broadcast,
            RetryRequest {
                model: self.config.llm_flagship.clone(),
                messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)],
                max_tokens: 8_000,
                reasoning_effort: None,
                schema: None,
                min_output_length: 200,
                max_retries: 2,
                scenario_id,
                step,
                artifact: op_name,
            },
        )
        .await;

        if outcome.content.is_empty() {
            return Err(GameMasterError::NoUsableOutput(op_name));
        }

        let result = ingest::ingest(
            self.client,
            self.persistence,
            self.broadcast,
            self.config,
            scenario_id,
            &outcome.content,
            Some(source_hint),
        )
        .await?;

        let created_id = result.parent_link_id.unwrap_or_else(Uuid::new_v4);
        let duration_ms = started.elapsed().as_millis() as i64;

        self.broadcast.emit(
            scenario_id,
            Event::OrderPublished {
                order_id: created_id,
                order_type: source_hint.to_string(),
                day: ato_day,
                source: crate::broadcast::OrderSource::GameMaster,
            },
        );

        Ok(GameMasterOutcome { created_id, duration_ms })
    }
}

#[async_trait]
impl<'a> GameMaster for LlmGameMaster<'a> {
    #[instrument(skip(self), fields(scenario_id = %scenario_id, ato_day))]
    async fn generate_ato(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<GameMasterOutcome, GameMasterError> {
        let packet = build_context_packet(self.persistence, scenario_id, ato_day).await?;
        let prompt = format!(
            "Draft the Air Tasking Order for ATO day {ato_day} of this campaign.\n\n{}",
            packet.render()
        );

        let result = self
            .run_document_op(
                scenario_id,
                ato_day,
                "ato",
                "Game Master ATO",
                "You are a Combined Air Operations Center planner drafting a formal Air Tasking \
                 Order message. Produce the full ATO text, referencing real packages, missions, \
                 callsigns, and timing consistent with the supplied context.",
                prompt,
                "ATO",
            )
            .await;

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(scenario_id = %scenario_id, ato_day, error = %err, "ATO generation failed, caller falls back to deterministic seeding");
                self.broadcast.emit(
                    scenario_id,
                    Event::GameMasterError { scenario_id, day: ato_day, error: err.to_string() },
                );
                Err(err)
            }
        }
    }

    #[instrument(skip(self), fields(scenario_id = %scenario_id, ato_day))]
    async fn generate_inject(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<GameMasterOutcome, GameMasterError> {
        let packet = build_context_packet(self.persistence, scenario_id, ato_day).await?;
        let prompt = format!(
            "Author a single new MSEL inject appropriate for ATO day {ato_day} of this campaign, \
             as a Master Scenario Events List entry with a DTG.\n\n{}",
            packet.render()
        );

        self.run_document_op(
            scenario_id,
            ato_day,
            "inject",
            "Game Master Inject",
            "You are an exercise control cell author drafting a single scenario inject.",
            prompt,
            "EVENT_LIST",
        )
        .await
    }

    #[instrument(skip(self), fields(scenario_id = %scenario_id, ato_day))]
    async fn assess_bda(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<GameMasterOutcome, GameMasterError> {
        let started = std::time::Instant::now();
        let packet = build_context_packet(self.persistence, scenario_id, ato_day).await?;

        let prompt = format!(
            "Produce a Battle Damage Assessment extraction for ATO day {ato_day} strikes. For each \
             struck target in the context below, assess damage.\n\n{}",
            packet.render()
        );

        let outcome = call_with_retry(
            self.client,
            self.persistence,
            self.broadcast,
            RetryRequest {
                model: self.config.llm_mid_range.clone(),
                messages: vec![
                    ChatMessage::system(
                        "You are a battle damage assessment analyst. Respond only with the \
                         requested structured JSON.",
                    ),
                    ChatMessage::user(prompt),
                ],
                max_tokens: 4_000,
                reasoning_effort: None,
                schema: Some(bda_extraction_schema()),
                min_output_length: 20,
                max_retries: 2,
                scenario_id,
                step: "Game Master BDA",
                artifact: "bda_extraction",
            },
        )
        .await;

        if outcome.content.is_empty() {
            let err = GameMasterError::NoUsableOutput("bda");
            self.broadcast.emit(
                scenario_id,
                Event::GameMasterError { scenario_id, day: ato_day, error: err.to_string() },
            );
            return Err(err);
        }

        let extraction: BdaExtraction = serde_json::from_str(&outcome.content)
            .map_err(|_| GameMasterError::NoUsableOutput("bda"))?;

        let jiptl = self
            .persistence
            .latest_planning_document(scenario_id, PlanningDocType::Jiptl)
            .await?;

        let mut created_id = Uuid::new_v4();
        if let Some(jiptl) = jiptl {
            let mut next_rank = self
                .persistence
                .list_planning_documents(scenario_id)
                .await?
                .len() as i32
                + 1;

            for assessment in &extraction.assessments {
                if assessment.damage_percent >= 70.0 && assessment.functional_kill {
                    self.append_priority_entry(
                        jiptl.id,
                        &mut next_rank,
                        "DEGRADED",
                        &format!(
                            "{} assessed {}% damage, functional kill confirmed",
                            assessment.target_name, assessment.damage_percent
                        ),
                    )
                    .await?;
                }
                if assessment.restrike_needed {
                    self.append_priority_entry(
                        jiptl.id,
                        &mut next_rank,
                        "RE-STRIKE",
                        &format!("{} requires re-strike", assessment.target_name),
                    )
                    .await?;
                }
            }
            created_id = jiptl.id.0;
        }

        info!(scenario_id = %scenario_id, ato_day, assessed = extraction.assessments.len(), "BDA assessment complete");

        let duration_ms = started.elapsed().as_millis() as i64;
        self.broadcast.emit(
            scenario_id,
            Event::GameMasterBdaComplete { scenario_id, day: ato_day, created_id, duration_ms },
        );
        Ok(GameMasterOutcome { created_id, duration_ms })
    }

    #[instrument(skip(self), fields(scenario_id = %scenario_id, ato_day))]
    async fn generate_maap(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<GameMasterOutcome, GameMasterError> {
        let packet = build_context_packet(self.persistence, scenario_id, ato_day).await?;
        let prompt = format!(
            "Draft the Master Air Attack Plan bridging strategic priorities to daily tasking for \
             ATO day {ato_day}.\n\n{}",
            packet.render()
        );

        let result = self
            .run_document_op(
                scenario_id,
                ato_day,
                "maap",
                "Game Master MAAP",
                "You are a strategy-to-tasking planner drafting a Master Air Attack Plan.",
                prompt,
                "MAAP",
            )
            .await;

        match result {
            Ok(outcome) => {
                self.broadcast.emit(
                    scenario_id,
                    Event::GameMasterMaapComplete {
                        scenario_id,
                        day: ato_day,
                        created_id: outcome.created_id,
                        duration_ms: outcome.duration_ms,
                    },
                );
                Ok(outcome)
            }
            Err(err) => {
                self.broadcast.emit(
                    scenario_id,
                    Event::GameMasterError { scenario_id, day: ato_day, error: err.to_string() },
                );
                Err(err)
            }
        }
    }
}

impl<'a> LlmGameMaster<'a> {
    async fn append_priority_entry(
        &self,
        planning_doc_id: PlanningDocId,
        next_rank: &mut i32,
        effect: &str,
        description: &str,
    ) -> Result<(), PersistenceError> {
        let entry = PriorityEntry {
            id: Uuid::new_v4(),
            planning_doc_id,
            rank: *next_rank,
            effect: effect.to_string(),
            description: description.to_string(),
            strategy_priority_id: None,
        };
        *next_rank += 1;
        self.persistence.append_priority_entries(planning_doc_id, &[entry]).await
    }
}

/// Runs the §4.3 Space Allocator for `ato_day` and persists its outcome:
/// fulfilled and degraded needs are marked fulfilled (they received some
/// capability); denied needs are left untouched for a future cycle.
pub async fn run_space_allocation(
    persistence: &dyn PersistenceLayer,
    scenario_id: ScenarioId,
    ato_day: i64,
) -> Result<RiskLevel, PersistenceError> {
    let needs_with_context = persistence.list_space_needs_for_day(scenario_id, ato_day).await?;
    let assets = persistence.list_space_assets(scenario_id).await?;
    let since = Utc::now() - chrono::Duration::days(1);
    let windows = persistence.list_coverage_windows(scenario_id, since).await?;

    let annotated: Vec<AnnotatedNeed> = needs_with_context
        .into_iter()
        .map(|ctx| {
            let mut need = ctx.need;
            need.strategy_rank = ctx.strategy_priority_rank;
            AnnotatedNeed { need, package_priority: ctx.package_priority_rank }
        })
        .collect();

    let report = allocation::allocate(annotated, &assets, &windows);

    let settled: Vec<_> = report
        .allocations
        .iter()
        .filter(|a| {
            matches!(
                a.status,
                crate::types::AllocationStatus::Fulfilled | crate::types::AllocationStatus::Degraded
            )
        })
        .map(|a| a.need_id)
        .collect();
    if !settled.is_empty() {
        persistence.mark_needs_fulfilled(&settled).await?;
    }

    info!(
        scenario_id = %scenario_id,
        ato_day,
        fulfilled = report.summary.fulfilled,
        degraded = report.summary.degraded,
        denied = report.summary.denied,
        "space allocation cycle complete"
    );

    Ok(report.summary.risk_level)
}
