//! Append-only audit logs: GenerationLog (LLM attempts) and IngestLog
//! (ingest pipeline runs).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::AttemptStatus;
use super::ids::{GenerationLogId, IngestLogId, ScenarioId};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GenerationLog {
    pub id: GenerationLogId,
    pub scenario_id: ScenarioId,
    pub step: String,
    pub artifact: String,
    pub attempt: i32,
    pub status: AttemptStatus,
    pub prompt_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub output_length: i32,
    pub duration_ms: i64,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IngestLog {
    pub id: IngestLogId,
    pub scenario_id: ScenarioId,
    pub input_hash: String,
    pub hierarchy_level: String,
    pub document_type: String,
    pub parent_link_id: Option<uuid::Uuid>,
    pub entity_count: i32,
    pub review_flag_count: i32,
    pub parse_time_ms: i64,
    pub created_at: DateTime<Utc>,
}
