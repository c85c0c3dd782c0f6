//! Scenario context packet (§4.8) — the briefing the Game Master hands the
//! LLM client ahead of every ATO/inject/BDA/MAAP prompt, assembled purely
//! from the persistence layer the way the teacher's `pipeline/coordinator.rs`
//! builds a run's context before dispatching work to its workers.

use crate::persistence::PersistenceLayer;
use crate::types::*;

/// Everything the prompt-builder in `mod.rs` needs to describe "where the
/// campaign stands" without re-querying the persistence layer itself.
#[derive(Debug, Clone, Default)]
pub struct ContextPacket {
    pub ato_day: i64,
    pub oplan_phase: String,
    pub priorities_summary: Vec<String>,
    pub friendly_orbat: Vec<String>,
    pub hostile_orbat: Vec<String>,
    pub space_assets_summary: Vec<String>,
    pub maap_excerpt: Option<String>,
    pub previous_day_mission_status: Vec<String>,
}

impl ContextPacket {
    /// Flatten the packet into the plain-text block every Game Master
    /// operation appends to its prompt. Sections with nothing to say are
    /// omitted rather than emitted empty.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("ATO DAY: {}\n", self.ato_day));
        out.push_str(&format!("OPLAN PHASE: {}\n", self.oplan_phase));

        if !self.priorities_summary.is_empty() {
            out.push_str("\nCOMMANDER'S PRIORITIES:\n");
            for line in &self.priorities_summary {
                out.push_str(&format!("- {line}\n"));
            }
        }

        if !self.friendly_orbat.is_empty() {
            out.push_str("\nFRIENDLY ORBAT:\n");
            for line in &self.friendly_orbat {
                out.push_str(&format!("- {line}\n"));
            }
        }

        if !self.hostile_orbat.is_empty() {
            out.push_str("\nHOSTILE ORBAT:\n");
            for line in &self.hostile_orbat {
                out.push_str(&format!("- {line}\n"));
            }
        }

        if !self.space_assets_summary.is_empty() {
            out.push_str("\nSPACE ASSETS:\n");
            for line in &self.space_assets_summary {
                out.push_str(&format!("- {line}\n"));
            }
        }

        if let Some(maap) = &self.maap_excerpt {
            out.push_str("\nMAAP EXCERPT:\n");
            out.push_str(maap);
            out.push('\n');
        }

        if !self.previous_day_mission_status.is_empty() {
            out.push_str("\nPREVIOUS DAY MISSION STATUS:\n");
            for line in &self.previous_day_mission_status {
                out.push_str(&format!("- {line}\n"));
            }
        }

        out
    }
}

/// MAAP excerpts are truncated to this many characters so a long MAAP body
/// doesn't dominate the prompt budget.
const MAAP_EXCERPT_CHARS: usize = 1200;

/// Assemble a `ContextPacket` for `ato_day` out of whatever the persistence
/// layer currently holds for `scenario_id`. Every query is best-effort in
/// the sense that an empty result degrades the corresponding section rather
/// than failing the whole packet — only a genuine storage error propagates.
pub async fn build_context_packet(
    persistence: &dyn PersistenceLayer,
    scenario_id: ScenarioId,
    ato_day: i64,
) -> Result<ContextPacket, crate::persistence::PersistenceError> {
    let strategy_docs = persistence.list_strategy_documents(scenario_id).await?;
    let oplan_phase = strategy_docs
        .iter()
        .max_by_key(|d| d.tier)
        .map(|doc| format!("{:?} (tier {}) effective {}", doc.doc_type, doc.tier, doc.effective_date.date_naive()))
        .unwrap_or_else(|| "no strategy cascade established yet".to_string());

    let mut priorities_summary = Vec::new();
    for doc in &strategy_docs {
        let priorities = persistence.list_strategy_priorities(doc.id).await?;
        for p in priorities {
            priorities_summary.push(format!("[{:?} #{}] {}: {}", doc.doc_type, p.rank, p.objective, p.description));
        }
    }
    priorities_summary.sort();

    let missions = persistence.list_all_active_missions(scenario_id).await?;
    let mut friendly_orbat: Vec<String> = missions
        .iter()
        .filter(|m| m.affiliation == Affiliation::Friendly)
        .map(|m| format!("{} ({}) — {} x {}, {:?}", m.callsign, m.mission_id, m.platform_count, m.platform_type, m.status))
        .collect();
    friendly_orbat.sort();
    friendly_orbat.dedup();

    let mut hostile_orbat: Vec<String> = missions
        .iter()
        .filter(|m| m.affiliation == Affiliation::Hostile)
        .map(|m| format!("{} ({}) — {} x {}, {:?}", m.callsign, m.mission_id, m.platform_count, m.platform_type, m.status))
        .collect();
    hostile_orbat.sort();
    hostile_orbat.dedup();

    let assets = persistence.list_space_assets(scenario_id).await?;
    let space_assets_summary: Vec<String> = assets
        .iter()
        .map(|a| {
            format!(
                "{} [{}] {:?} — {} — {:?}",
                a.name,
                a.constellation,
                a.affiliation,
                a.capabilities
                    .iter()
                    .map(|c| format!("{c:?}"))
                    .collect::<Vec<_>>()
                    .join("/"),
                a.status
            )
        })
        .collect();

    let maap_excerpt = persistence
        .latest_planning_document(scenario_id, PlanningDocType::Maap)
        .await?
        .map(|doc| {
            if doc.content.len() > MAAP_EXCERPT_CHARS {
                format!("{}…", &doc.content[..MAAP_EXCERPT_CHARS])
            } else {
                doc.content
            }
        });

    let previous_day_mission_status = if ato_day > 0 {
        let prev = persistence.list_missions_for_day(scenario_id, ato_day - 1).await?;
        let mut lines: Vec<String> = prev
            .iter()
            .map(|m| format!("{} ({}): {:?}", m.callsign, m.mission_id, m.status))
            .collect();
        lines.sort();
        lines
    } else {
        Vec::new()
    };

    Ok(ContextPacket {
        ato_day,
        oplan_phase,
        priorities_summary,
        friendly_orbat,
        hostile_orbat,
        space_assets_summary,
        maap_excerpt,
        previous_day_mission_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryPersistence;
    use crate::types::{GenerationStatus, Scenario};
    use chrono::{TimeZone, Utc};

    fn scenario() -> Scenario {
        Scenario {
            id: ScenarioId::new(),
            name: "Test".to_string(),
            theater: "Test".to_string(),
            adversary: "Test".to_string(),
            start_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap(),
            generation_status: GenerationStatus::Complete,
            generation_step: None,
            generation_progress: 100,
            generation_error: None,
        }
    }

    #[tokio::test]
    async fn empty_scenario_yields_placeholder_phase_and_no_sections() {
        let persistence = InMemoryPersistence::new();
        let scenario = scenario();
        persistence.create_scenario(&scenario).await.unwrap();

        let packet = build_context_packet(&persistence, scenario.id, 0).await.unwrap();
        assert_eq!(packet.oplan_phase, "no strategy cascade established yet");
        assert!(packet.priorities_summary.is_empty());
        assert!(packet.render().contains("ATO DAY: 0"));
    }

    #[tokio::test]
    async fn strategy_cascade_drives_oplan_phase_and_priorities() {
        let persistence = InMemoryPersistence::new();
        let scenario = scenario();
        persistence.create_scenario(&scenario).await.unwrap();

        let doc = StrategyDocument {
            id: StrategyDocId::new(),
            scenario_id: scenario.id,
            doc_type: StrategyDocType::Oplan,
            tier: 5,
            parent_doc_id: None,
            authority_level: "COCOM".to_string(),
            content: "...".to_string(),
            effective_date: scenario.start_date,
        };
        let priority = StrategyPriority {
            id: uuid::Uuid::new_v4(),
            strategy_doc_id: doc.id,
            rank: 1,
            objective: "Establish air superiority".to_string(),
            description: "Suppress enemy IADS within 48 hours".to_string(),
        };
        persistence.create_strategy_document(&doc, &[priority]).await.unwrap();

        let packet = build_context_packet(&persistence, scenario.id, 1).await.unwrap();
        assert!(packet.oplan_phase.contains("Oplan"));
        assert_eq!(packet.priorities_summary.len(), 1);
        assert!(packet.render().contains("Establish air superiority"));
    }
}
