//! Stage 3: Link & Persist (§4.6). Cascade-links a normalized document into
//! the strategy -> planning -> order hierarchy and writes it. The ORDER case
//! is the one place the ingest pipeline produces more than one row — it goes
//! through `PersistenceLayer::create_order_bundle`, a single transactional
//! unit per §9's transactionality note, so a partially-materialized order
//! never becomes observable.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::ingest::dtg::parse_dtg;
use crate::ingest::enum_normalize::{
    normalize_capability_type, normalize_support_type, normalize_waypoint_type,
    normalize_window_type,
};
use crate::ingest::normalize::Normalized;
use crate::persistence::{
    MissionBundle, OrderBundle, PackageBundle, PersistenceError, PersistenceLayer,
};
use crate::types::*;

pub struct LinkResult {
    pub parent_link_id: Option<Uuid>,
    pub entity_count: i32,
    pub review_flag_count: i32,
}

/// Best-effort date parse: RFC3339 first, then a bare `YYYY-MM-DD`, falling
/// back to `fallback` when the LLM's date string doesn't parse — a free-text
/// date field is never worth aborting the whole ingest run over.
fn parse_date_or(raw: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = raw else { return fallback };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return dt.and_utc();
        }
    }
    fallback
}

fn strategy_doc_type(raw: &str) -> StrategyDocType {
    match raw.to_uppercase().as_str() {
        "NDS" => StrategyDocType::Nds,
        "NMS" => StrategyDocType::Nms,
        "JSCP" => StrategyDocType::Jscp,
        "CONPLAN" => StrategyDocType::Conplan,
        _ => StrategyDocType::Oplan,
    }
}

fn planning_doc_type(raw: &str) -> PlanningDocType {
    match raw.to_uppercase().as_str() {
        "JIPTL" => PlanningDocType::Jiptl,
        "SPINS" => PlanningDocType::Spins,
        "ACO" => PlanningDocType::Aco,
        "MAAP" => PlanningDocType::Maap,
        _ => PlanningDocType::Msel,
    }
}

fn order_type(raw: &str) -> OrderType {
    match raw.to_uppercase().as_str() {
        "ATO" => OrderType::Ato,
        "MTO" => OrderType::Mto,
        "STO" => OrderType::Sto,
        "OPORD" => OrderType::Opord,
        "EXORD" => OrderType::Exord,
        "FRAGORD" => OrderType::Fragord,
        "ACO" => OrderType::Aco,
        _ => OrderType::Spins,
    }
}

fn domain(raw: &str) -> Domain {
    match raw.to_uppercase().as_str() {
        "MARITIME" => Domain::Maritime,
        "SPACE" => Domain::Space,
        "LAND" => Domain::Land,
        _ => Domain::Air,
    }
}

fn affiliation(raw: &str) -> Affiliation {
    match raw.to_uppercase().as_str() {
        "HOSTILE" => Affiliation::Hostile,
        _ => Affiliation::Friendly,
    }
}

fn mission_criticality(raw: &str) -> MissionCriticality {
    match raw.to_uppercase().as_str() {
        "CRITICAL" => MissionCriticality::Critical,
        "ESSENTIAL" => MissionCriticality::Essential,
        "ENHANCING" => MissionCriticality::Enhancing,
        _ => MissionCriticality::Routine,
    }
}

fn inject_type(raw: &str) -> InjectType {
    match raw.to_uppercase().as_str() {
        "FRICTION" => InjectType::Friction,
        "INTEL" => InjectType::Intel,
        "CRISIS" => InjectType::Crisis,
        "SPACE" => InjectType::Space,
        "INFORMATION" => InjectType::Information,
        "ACTION" => InjectType::Action,
        "DECISION_POINT" => InjectType::DecisionPoint,
        _ => InjectType::Contingency,
    }
}

/// Tokenize to lowercase words longer than 3 characters (§4.6 traceability).
fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 3)
        .collect()
}

/// Keyword-overlap ratio against the best matching strategy priority:
/// |intersection| / |planning-priority tokens|, the base being the entry we
/// are trying to trace (§4.6). Returns the best match's id when the ratio
/// clears 0.15, else `None`.
fn best_traceability_match(
    effect: &str,
    description: &str,
    strategy_priorities: &[StrategyPriority],
) -> Option<Uuid> {
    const THRESHOLD: f64 = 0.15;

    let planning_tokens = tokenize(&format!("{effect} {description}"));
    if planning_tokens.is_empty() {
        return None;
    }

    strategy_priorities
        .iter()
        .filter_map(|sp| {
            let strategy_tokens = tokenize(&format!("{} {}", sp.objective, sp.description));
            let overlap = planning_tokens.intersection(&strategy_tokens).count();
            let ratio = overlap as f64 / planning_tokens.len() as f64;
            (ratio >= THRESHOLD).then_some((sp.id, ratio))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

pub async fn link_and_persist_strategy(
    persistence: &dyn PersistenceLayer,
    scenario_id: ScenarioId,
    scenario_start: DateTime<Utc>,
    normalized: crate::ingest::normalize::NormalizedStrategy,
) -> Result<LinkResult, PersistenceError> {
    let doc_type = strategy_doc_type(&normalized.doc_type);
    let tier = doc_type.tier() as i16;

    let existing = persistence.list_strategy_documents(scenario_id).await?;
    let parent = existing
        .iter()
        .filter(|d| d.tier < tier)
        .max_by_key(|d| d.tier);
    let parent_doc_id = parent.map(|d| d.id);

    let doc_id = StrategyDocId::new();
    let doc = StrategyDocument {
        id: doc_id,
        scenario_id,
        doc_type,
        tier,
        parent_doc_id,
        authority_level: normalized.authority_level,
        content: normalized.content,
        effective_date: parse_date_or(normalized.effective_date_str.as_deref(), scenario_start),
    };

    let priorities: Vec<StrategyPriority> = normalized
        .priorities
        .into_iter()
        .map(|p| StrategyPriority {
            id: Uuid::new_v4(),
            strategy_doc_id: doc_id,
            rank: p.rank,
            objective: p.objective,
            description: p.description,
        })
        .collect();

    let entity_count = 1 + priorities.len() as i32;
    persistence.create_strategy_document(&doc, &priorities).await?;

    Ok(LinkResult {
        parent_link_id: parent_doc_id.map(|id| id.0),
        entity_count,
        review_flag_count: 0,
    })
}

pub async fn link_and_persist_planning(
    persistence: &dyn PersistenceLayer,
    scenario_id: ScenarioId,
    scenario_start: DateTime<Utc>,
    normalized: crate::ingest::normalize::NormalizedPlanning,
) -> Result<LinkResult, PersistenceError> {
    let doc_type = planning_doc_type(&normalized.doc_type);
    let strategy_parent = persistence.highest_tier_strategy_document(scenario_id).await?;
    let strategy_priorities = match &strategy_parent {
        Some(parent) => persistence.list_strategy_priorities(parent.id).await?,
        None => Vec::new(),
    };

    let doc_id = PlanningDocId::new();
    let doc = PlanningDocument {
        id: doc_id,
        scenario_id,
        doc_type,
        strategy_doc_id: strategy_parent.as_ref().map(|d| d.id),
        content: normalized.content,
        effective_date: parse_date_or(normalized.effective_date_str.as_deref(), scenario_start),
    };

    let priorities: Vec<PriorityEntry> = normalized
        .priorities
        .into_iter()
        .map(|p| PriorityEntry {
            id: Uuid::new_v4(),
            planning_doc_id: doc_id,
            rank: p.rank,
            effect: p.effect.clone(),
            description: p.description.clone(),
            strategy_priority_id: best_traceability_match(&p.effect, &p.description, &strategy_priorities),
        })
        .collect();

    let entity_count = 1 + priorities.len() as i32;
    persistence.create_planning_document(&doc, &priorities).await?;

    Ok(LinkResult {
        parent_link_id: strategy_parent.map(|d| d.id.0),
        entity_count,
        review_flag_count: 0,
    })
}

pub async fn link_and_persist_order(
    persistence: &dyn PersistenceLayer,
    scenario_id: ScenarioId,
    scenario_start: DateTime<Utc>,
    normalized: crate::ingest::normalize::NormalizedOrder,
) -> Result<LinkResult, PersistenceError> {
    let jiptl = persistence
        .latest_planning_document(scenario_id, PlanningDocType::Jiptl)
        .await?;
    let parent = match jiptl {
        Some(doc) => Some(doc),
        None => {
            let all = persistence.list_planning_documents(scenario_id).await?;
            all.into_iter().max_by_key(|d| d.effective_date)
        }
    };

    let mut review_flag_count = 0i32;
    let mut entity_count = 1i32; // the order itself

    let order_id = TaskingOrderId::new();
    let order = TaskingOrder {
        id: order_id,
        scenario_id,
        order_type: order_type(&normalized.order_type),
        ato_day_number: normalized.ato_day_number,
        effective_start: parse_date_or(Some(&normalized.effective_start_str), scenario_start),
        effective_end: parse_date_or(Some(&normalized.effective_end_str), scenario_start),
        planning_doc_id: parent.as_ref().map(|d| d.id),
    };

    let mut packages = Vec::new();
    for np in normalized.packages {
        let package_id = MissionPackageId::new();
        let package = MissionPackage {
            id: package_id,
            tasking_order_id: order_id,
            package_id: np.package_id,
            priority_rank: np.priority_rank,
            mission_type: np.mission_type,
            effect_desired: np.effect_desired,
        };
        entity_count += 1;

        let mut missions = Vec::new();
        for nm in np.missions {
            let mission_id = MissionId::new();
            let mission = Mission {
                id: mission_id,
                mission_package_id: package_id,
                mission_id: nm.mission_id,
                callsign: nm.callsign,
                domain: domain(&nm.domain),
                platform_type: nm.platform_type,
                platform_count: nm.platform_count,
                mission_type: nm.mission_type,
                status: MissionStatus::Planned,
                affiliation: affiliation(&nm.affiliation),
            };
            entity_count += 1;

            let mut waypoints = Vec::new();
            for (idx, wp) in nm.waypoints.into_iter().enumerate() {
                let normalized_wp = normalize_waypoint_type(&wp.waypoint_type);
                if normalized_wp.reviewed {
                    review_flag_count += 1;
                }
                waypoints.push(Waypoint {
                    id: Uuid::new_v4(),
                    mission_id,
                    // §3 invariant: dense 1..N sequence regardless of what the LLM emitted.
                    sequence: (idx + 1) as i32,
                    waypoint_type: normalized_wp.value,
                    lat: wp.lat,
                    lon: wp.lon,
                    altitude_ft: wp.altitude_ft,
                    speed_kts: wp.speed_kts,
                });
                entity_count += 1;
            }

            let mut time_windows = Vec::new();
            for tw in nm.time_windows {
                let normalized_tw = normalize_window_type(&tw.window_type);
                if normalized_tw.reviewed {
                    review_flag_count += 1;
                }
                time_windows.push(TimeWindow {
                    id: Uuid::new_v4(),
                    mission_id,
                    window_type: normalized_tw.value,
                    start: parse_date_or(Some(&tw.start_str), scenario_start),
                    end: parse_date_or(Some(&tw.end_str), scenario_start),
                });
                entity_count += 1;
            }

            let targets: Vec<MissionTarget> = nm
                .targets
                .into_iter()
                .map(|t| {
                    entity_count += 1;
                    MissionTarget {
                        id: Uuid::new_v4(),
                        mission_id,
                        target_name: t.target_name,
                        lat: t.lat,
                        lon: t.lon,
                        target_type: t.target_type,
                    }
                })
                .collect();

            let mut support_requirements = Vec::new();
            for sr in nm.support_requirements {
                let normalized_sr = normalize_support_type(&sr.support_type);
                if normalized_sr.reviewed {
                    review_flag_count += 1;
                }
                support_requirements.push(SupportRequirement {
                    id: Uuid::new_v4(),
                    mission_id,
                    support_type: normalized_sr.value,
                    description: sr.description,
                });
                entity_count += 1;
            }

            let mut space_needs = Vec::new();
            for sn in nm.space_needs {
                let normalized_cap = normalize_capability_type(&sn.capability_type);
                if normalized_cap.reviewed {
                    review_flag_count += 1;
                }
                let fallback = sn.fallback_capability.as_deref().map(|raw| {
                    let normalized_fallback = normalize_capability_type(raw);
                    if normalized_fallback.reviewed {
                        review_flag_count += 1;
                    }
                    normalized_fallback.value
                });
                space_needs.push(SpaceNeed {
                    id: SpaceNeedId::new(),
                    mission_id,
                    capability_type: normalized_cap.value,
                    priority: sn.priority,
                    start_time: parse_date_or(Some(&sn.start_str), scenario_start),
                    end_time: parse_date_or(Some(&sn.end_str), scenario_start),
                    coverage_lat: sn.coverage_lat,
                    coverage_lon: sn.coverage_lon,
                    fallback_capability: fallback,
                    mission_criticality: mission_criticality(&sn.mission_criticality),
                    fulfilled: false,
                    strategy_rank: None,
                });
                entity_count += 1;
            }

            missions.push(MissionBundle {
                mission,
                waypoints,
                time_windows,
                targets,
                support_requirements,
                space_needs,
            });
        }

        packages.push(PackageBundle { package, missions });
    }

    let bundle = OrderBundle { order, packages };
    persistence.create_order_bundle(&bundle).await?;

    Ok(LinkResult {
        parent_link_id: parent.map(|d| d.id.0),
        entity_count,
        review_flag_count,
    })
}

pub async fn link_and_persist_event_list(
    persistence: &dyn PersistenceLayer,
    scenario_id: ScenarioId,
    scenario_start: DateTime<Utc>,
    normalized: crate::ingest::normalize::NormalizedEventList,
) -> Result<LinkResult, PersistenceError> {
    let doc_id = PlanningDocId::new();
    let doc = PlanningDocument {
        id: doc_id,
        scenario_id,
        doc_type: PlanningDocType::Msel,
        strategy_doc_id: None,
        content: format!("{} scripted injects", normalized.injects.len()),
        effective_date: scenario_start,
    };
    persistence.create_planning_document(&doc, &[]).await?;

    let mut entity_count = 1i32;
    for inject in normalized.injects {
        let (trigger_day, trigger_hour) =
            parse_dtg(&inject.dtg, scenario_start).unwrap_or((0, 0));
        let record = ScenarioInject {
            id: ScenarioInjectId::new(),
            scenario_id,
            title: inject.title,
            description: inject.description,
            impact: inject.impact,
            trigger_day,
            trigger_hour,
            inject_type: inject_type(&inject.inject_type),
            fired: false,
            fired_at: None,
        };
        persistence.create_inject(&record).await?;
        entity_count += 1;
    }

    Ok(LinkResult {
        parent_link_id: Some(doc_id.0),
        entity_count,
        review_flag_count: 0,
    })
}

pub async fn link_and_persist(
    persistence: &dyn PersistenceLayer,
    scenario_id: ScenarioId,
    scenario_start: DateTime<Utc>,
    normalized: Normalized,
) -> Result<LinkResult, PersistenceError> {
    match normalized {
        Normalized::Strategy(n) => {
            link_and_persist_strategy(persistence, scenario_id, scenario_start, n).await
        }
        Normalized::Planning(n) => {
            link_and_persist_planning(persistence, scenario_id, scenario_start, n).await
        }
        Normalized::Order(n) => link_and_persist_order(persistence, scenario_id, scenario_start, n).await,
        Normalized::EventList(n) => {
            link_and_persist_event_list(persistence, scenario_id, scenario_start, n).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traceability_match_clears_threshold_on_keyword_overlap() {
        let strategy_priorities = vec![StrategyPriority {
            id: Uuid::new_v4(),
            strategy_doc_id: StrategyDocId::new(),
            rank: 1,
            objective: "degrade enemy integrated air defense systems".to_string(),
            description: "suppress early warning radar network".to_string(),
        }];
        let matched = best_traceability_match(
            "destroy",
            "strike enemy integrated air defense radar sites",
            &strategy_priorities,
        );
        assert_eq!(matched, Some(strategy_priorities[0].id));
    }

    #[test]
    fn traceability_match_is_none_below_threshold() {
        let strategy_priorities = vec![StrategyPriority {
            id: Uuid::new_v4(),
            strategy_doc_id: StrategyDocId::new(),
            rank: 1,
            objective: "maritime blockade enforcement".to_string(),
            description: "interdict adversary shipping lanes".to_string(),
        }];
        let matched = best_traceability_match(
            "logistics",
            "resupply forward operating bases with fuel",
            &strategy_priorities,
        );
        assert_eq!(matched, None);
    }
}
