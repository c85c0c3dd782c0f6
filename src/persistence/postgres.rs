//! PostgreSQL-backed `PersistenceLayer`, mirroring the teacher's
//! `hub::db` pool/migration setup and the raw-`sqlx::query` style of
//! `hub::intelligence::job_queue`. Every struct already derives
//! `sqlx::FromRow` with field names matching their column names, so reads
//! are a plain `query_as` against the table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use super::{not_found, NeedWithContext, OrderBundle, PersistenceError, PersistenceLayer};
use crate::types::*;

pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        info!("connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn storage_err(e: sqlx::Error) -> PersistenceError {
    match e {
        sqlx::Error::RowNotFound => PersistenceError::NotFound,
        sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
            PersistenceError::ForeignKeyViolation(db.message().to_string())
        }
        other => PersistenceError::Storage(other.to_string()),
    }
}

#[async_trait]
impl PersistenceLayer for PostgresPersistence {
    // ---- Scenario -------------------------------------------------------

    async fn create_scenario(&self, scenario: &Scenario) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"INSERT INTO scenarios
               (id, name, theater, adversary, start_date, end_date,
                generation_status, generation_step, generation_progress, generation_error)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(scenario.id)
        .bind(&scenario.name)
        .bind(&scenario.theater)
        .bind(&scenario.adversary)
        .bind(scenario.start_date)
        .bind(scenario.end_date)
        .bind(scenario.generation_status)
        .bind(&scenario.generation_step)
        .bind(scenario.generation_progress)
        .bind(&scenario.generation_error)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_scenario(&self, id: ScenarioId) -> Result<Scenario, PersistenceError> {
        sqlx::query_as::<_, Scenario>("SELECT * FROM scenarios WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?
            .ok_or_else(not_found)
    }

    async fn update_scenario_generation(
        &self,
        id: ScenarioId,
        status: GenerationStatus,
        step: Option<&str>,
        progress: i32,
        error: Option<&str>,
    ) -> Result<(), PersistenceError> {
        let result = sqlx::query(
            r#"UPDATE scenarios
               SET generation_status = $1, generation_step = $2,
                   generation_progress = $3, generation_error = $4
               WHERE id = $5"#,
        )
        .bind(status)
        .bind(step)
        .bind(progress)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        Ok(())
    }

    async fn delete_scenario(&self, id: ScenarioId) -> Result<(), PersistenceError> {
        let result = sqlx::query("DELETE FROM scenarios WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        Ok(())
    }

    async fn list_scenarios(&self) -> Result<Vec<Scenario>, PersistenceError> {
        sqlx::query_as::<_, Scenario>("SELECT * FROM scenarios ORDER BY start_date")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)
    }

    // ---- SimulationState --------------------------------------------------

    async fn get_simulation_state(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Option<SimulationState>, PersistenceError> {
        sqlx::query_as::<_, SimulationState>(
            "SELECT * FROM simulation_states WHERE scenario_id = $1",
        )
        .bind(scenario_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)
    }

    async fn upsert_simulation_state(&self, state: &SimulationState) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"INSERT INTO simulation_states
               (scenario_id, status, sim_time, real_start_time, compression_ratio, current_ato_day)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (scenario_id) DO UPDATE SET
                   status = EXCLUDED.status,
                   sim_time = EXCLUDED.sim_time,
                   real_start_time = EXCLUDED.real_start_time,
                   compression_ratio = EXCLUDED.compression_ratio,
                   current_ato_day = EXCLUDED.current_ato_day"#,
        )
        .bind(state.scenario_id)
        .bind(state.status)
        .bind(state.sim_time)
        .bind(state.real_start_time)
        .bind(state.compression_ratio)
        .bind(state.current_ato_day)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn any_running_simulation(&self) -> Result<Option<ScenarioId>, PersistenceError> {
        let row: Option<(ScenarioId,)> = sqlx::query_as(
            "SELECT scenario_id FROM simulation_states WHERE status = $1 LIMIT 1",
        )
        .bind(SimStatus::Running)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(row.map(|(id,)| id))
    }

    // ---- Strategy cascade ---------------------------------------------------

    async fn create_strategy_document(
        &self,
        doc: &StrategyDocument,
        priorities: &[StrategyPriority],
    ) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        sqlx::query(
            r#"INSERT INTO strategy_documents
               (id, scenario_id, doc_type, tier, parent_doc_id, authority_level, content, effective_date)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(doc.id)
        .bind(doc.scenario_id)
        .bind(doc.doc_type)
        .bind(doc.tier)
        .bind(doc.parent_doc_id)
        .bind(&doc.authority_level)
        .bind(&doc.content)
        .bind(doc.effective_date)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        for p in priorities {
            sqlx::query(
                r#"INSERT INTO strategy_priorities (id, strategy_doc_id, rank, objective, description)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(p.id)
            .bind(p.strategy_doc_id)
            .bind(p.rank)
            .bind(&p.objective)
            .bind(&p.description)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }
        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn list_strategy_documents(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Vec<StrategyDocument>, PersistenceError> {
        sqlx::query_as::<_, StrategyDocument>(
            "SELECT * FROM strategy_documents WHERE scenario_id = $1 ORDER BY tier",
        )
        .bind(scenario_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)
    }

    async fn highest_tier_strategy_document(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Option<StrategyDocument>, PersistenceError> {
        sqlx::query_as::<_, StrategyDocument>(
            "SELECT * FROM strategy_documents WHERE scenario_id = $1 ORDER BY tier DESC LIMIT 1",
        )
        .bind(scenario_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)
    }

    async fn list_strategy_priorities(
        &self,
        strategy_doc_id: StrategyDocId,
    ) -> Result<Vec<StrategyPriority>, PersistenceError> {
        sqlx::query_as::<_, StrategyPriority>(
            "SELECT * FROM strategy_priorities WHERE strategy_doc_id = $1 ORDER BY rank",
        )
        .bind(strategy_doc_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)
    }

    // ---- Planning documents -----------------------------------------------

    async fn create_planning_document(
        &self,
        doc: &PlanningDocument,
        priorities: &[PriorityEntry],
    ) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        sqlx::query(
            r#"INSERT INTO planning_documents
               (id, scenario_id, doc_type, strategy_doc_id, content, effective_date)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(doc.id)
        .bind(doc.scenario_id)
        .bind(doc.doc_type)
        .bind(doc.strategy_doc_id)
        .bind(&doc.content)
        .bind(doc.effective_date)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        for p in priorities {
            sqlx::query(
                r#"INSERT INTO priority_entries
                   (id, planning_doc_id, rank, effect, description, strategy_priority_id)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(p.id)
            .bind(p.planning_doc_id)
            .bind(p.rank)
            .bind(&p.effect)
            .bind(&p.description)
            .bind(p.strategy_priority_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }
        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn list_planning_documents(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Vec<PlanningDocument>, PersistenceError> {
        sqlx::query_as::<_, PlanningDocument>(
            "SELECT * FROM planning_documents WHERE scenario_id = $1 ORDER BY effective_date",
        )
        .bind(scenario_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)
    }

    async fn append_priority_entries(
        &self,
        planning_doc_id: PlanningDocId,
        entries: &[PriorityEntry],
    ) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        for p in entries {
            sqlx::query(
                r#"INSERT INTO priority_entries
                   (id, planning_doc_id, rank, effect, description, strategy_priority_id)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(p.id)
            .bind(planning_doc_id)
            .bind(p.rank)
            .bind(&p.effect)
            .bind(&p.description)
            .bind(p.strategy_priority_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }
        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn latest_planning_document(
        &self,
        scenario_id: ScenarioId,
        doc_type: PlanningDocType,
    ) -> Result<Option<PlanningDocument>, PersistenceError> {
        sqlx::query_as::<_, PlanningDocument>(
            r#"SELECT * FROM planning_documents
               WHERE scenario_id = $1 AND doc_type = $2
               ORDER BY effective_date DESC LIMIT 1"#,
        )
        .bind(scenario_id)
        .bind(doc_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)
    }

    // ---- Tasking orders (transactional nested write) -----------------------

    async fn create_order_bundle(&self, bundle: &OrderBundle) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        let order = &bundle.order;
        sqlx::query(
            r#"INSERT INTO tasking_orders
               (id, scenario_id, order_type, ato_day_number, effective_start, effective_end, planning_doc_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(order.id)
        .bind(order.scenario_id)
        .bind(order.order_type)
        .bind(order.ato_day_number)
        .bind(order.effective_start)
        .bind(order.effective_end)
        .bind(order.planning_doc_id)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        for pkg in &bundle.packages {
            let p = &pkg.package;
            sqlx::query(
                r#"INSERT INTO mission_packages
                   (id, tasking_order_id, package_id, priority_rank, mission_type, effect_desired)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(p.id)
            .bind(p.tasking_order_id)
            .bind(&p.package_id)
            .bind(p.priority_rank)
            .bind(&p.mission_type)
            .bind(&p.effect_desired)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

            for mb in &pkg.missions {
                let m = &mb.mission;
                sqlx::query(
                    r#"INSERT INTO missions
                       (id, mission_package_id, mission_id, callsign, domain, platform_type,
                        platform_count, mission_type, status, affiliation)
                       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
                )
                .bind(m.id)
                .bind(m.mission_package_id)
                .bind(&m.mission_id)
                .bind(&m.callsign)
                .bind(m.domain)
                .bind(&m.platform_type)
                .bind(m.platform_count)
                .bind(&m.mission_type)
                .bind(m.status)
                .bind(m.affiliation)
                .execute(&mut *tx)
                .await
                .map_err(storage_err)?;

                for w in &mb.waypoints {
                    sqlx::query(
                        r#"INSERT INTO waypoints
                           (id, mission_id, sequence, waypoint_type, lat, lon, altitude_ft, speed_kts)
                           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
                    )
                    .bind(w.id)
                    .bind(w.mission_id)
                    .bind(w.sequence)
                    .bind(w.waypoint_type)
                    .bind(w.lat)
                    .bind(w.lon)
                    .bind(w.altitude_ft)
                    .bind(w.speed_kts)
                    .execute(&mut *tx)
                    .await
                    .map_err(storage_err)?;
                }
                for tw in &mb.time_windows {
                    sqlx::query(
                        r#"INSERT INTO time_windows (id, mission_id, window_type, "start", "end")
                           VALUES ($1, $2, $3, $4, $5)"#,
                    )
                    .bind(tw.id)
                    .bind(tw.mission_id)
                    .bind(tw.window_type)
                    .bind(tw.start)
                    .bind(tw.end)
                    .execute(&mut *tx)
                    .await
                    .map_err(storage_err)?;
                }
                for t in &mb.targets {
                    sqlx::query(
                        r#"INSERT INTO mission_targets (id, mission_id, target_name, lat, lon, target_type)
                           VALUES ($1, $2, $3, $4, $5, $6)"#,
                    )
                    .bind(t.id)
                    .bind(t.mission_id)
                    .bind(&t.target_name)
                    .bind(t.lat)
                    .bind(t.lon)
                    .bind(&t.target_type)
                    .execute(&mut *tx)
                    .await
                    .map_err(storage_err)?;
                }
                for sr in &mb.support_requirements {
                    sqlx::query(
                        r#"INSERT INTO support_requirements (id, mission_id, support_type, description)
                           VALUES ($1, $2, $3, $4)"#,
                    )
                    .bind(sr.id)
                    .bind(sr.mission_id)
                    .bind(sr.support_type)
                    .bind(&sr.description)
                    .execute(&mut *tx)
                    .await
                    .map_err(storage_err)?;
                }
                for need in &mb.space_needs {
                    sqlx::query(
                        r#"INSERT INTO space_needs
                           (id, mission_id, capability_type, priority, start_time, end_time,
                            coverage_lat, coverage_lon, fallback_capability, mission_criticality,
                            fulfilled, strategy_rank)
                           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
                    )
                    .bind(need.id)
                    .bind(need.mission_id)
                    .bind(need.capability_type)
                    .bind(need.priority)
                    .bind(need.start_time)
                    .bind(need.end_time)
                    .bind(need.coverage_lat)
                    .bind(need.coverage_lon)
                    .bind(need.fallback_capability)
                    .bind(need.mission_criticality)
                    .bind(need.fulfilled)
                    .bind(need.strategy_rank)
                    .execute(&mut *tx)
                    .await
                    .map_err(storage_err)?;
                }
            }
        }
        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn list_tasking_orders(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<Vec<TaskingOrder>, PersistenceError> {
        sqlx::query_as::<_, TaskingOrder>(
            "SELECT * FROM tasking_orders WHERE scenario_id = $1 AND ato_day_number = $2",
        )
        .bind(scenario_id)
        .bind(ato_day)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)
    }

    async fn list_missions_for_day(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<Vec<Mission>, PersistenceError> {
        sqlx::query_as::<_, Mission>(
            r#"SELECT m.* FROM missions m
               JOIN mission_packages p ON p.id = m.mission_package_id
               JOIN tasking_orders o ON o.id = p.tasking_order_id
               WHERE o.scenario_id = $1 AND o.ato_day_number = $2"#,
        )
        .bind(scenario_id)
        .bind(ato_day)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)
    }

    async fn list_all_active_missions(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Vec<Mission>, PersistenceError> {
        sqlx::query_as::<_, Mission>(
            r#"SELECT m.* FROM missions m
               JOIN mission_packages p ON p.id = m.mission_package_id
               JOIN tasking_orders o ON o.id = p.tasking_order_id
               WHERE o.scenario_id = $1 AND m.status NOT IN ('RECOVERED', 'LOST')"#,
        )
        .bind(scenario_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)
    }

    async fn list_waypoints(&self, mission_id: MissionId) -> Result<Vec<Waypoint>, PersistenceError> {
        sqlx::query_as::<_, Waypoint>(
            "SELECT * FROM waypoints WHERE mission_id = $1 ORDER BY sequence",
        )
        .bind(mission_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)
    }

    async fn list_time_windows(
        &self,
        mission_id: MissionId,
    ) -> Result<Vec<TimeWindow>, PersistenceError> {
        sqlx::query_as::<_, TimeWindow>(r#"SELECT * FROM time_windows WHERE mission_id = $1"#)
            .bind(mission_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)
    }

    async fn update_mission_status(
        &self,
        mission_id: MissionId,
        status: MissionStatus,
    ) -> Result<(), PersistenceError> {
        let result = sqlx::query("UPDATE missions SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(mission_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        Ok(())
    }

    // ---- Space assets / needs / coverage -----------------------------------

    async fn create_space_assets(&self, assets: &[SpaceAsset]) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        for a in assets {
            sqlx::query(
                r#"INSERT INTO space_assets
                   (id, scenario_id, name, constellation, affiliation, capabilities,
                    tle_line1, tle_line2, inclination_deg, period_min, eccentricity, base_lon, status)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
            )
            .bind(a.id)
            .bind(a.scenario_id)
            .bind(&a.name)
            .bind(&a.constellation)
            .bind(a.affiliation)
            .bind(&a.capabilities)
            .bind(&a.tle_line1)
            .bind(&a.tle_line2)
            .bind(a.inclination_deg)
            .bind(a.period_min)
            .bind(a.eccentricity)
            .bind(a.base_lon)
            .bind(a.status)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }
        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn list_space_assets(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Vec<SpaceAsset>, PersistenceError> {
        sqlx::query_as::<_, SpaceAsset>("SELECT * FROM space_assets WHERE scenario_id = $1")
            .bind(scenario_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)
    }

    async fn update_asset_status(
        &self,
        asset_id: SpaceAssetId,
        status: AssetStatus,
    ) -> Result<(), PersistenceError> {
        let result = sqlx::query("UPDATE space_assets SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(asset_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        Ok(())
    }

    async fn list_space_needs_for_day(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<Vec<NeedWithContext>, PersistenceError> {
        let rows: Vec<(SpaceNeed, i32)> = sqlx::query_as(
            r#"SELECT n.*, p.priority_rank AS "priority_rank!"
               FROM space_needs n
               JOIN missions m ON m.id = n.mission_id
               JOIN mission_packages p ON p.id = m.mission_package_id
               JOIN tasking_orders o ON o.id = p.tasking_order_id
               WHERE o.scenario_id = $1 AND o.ato_day_number = $2"#,
        )
        .bind(scenario_id)
        .bind(ato_day)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows
            .into_iter()
            .map(|(need, package_priority_rank)| NeedWithContext {
                strategy_priority_rank: need.strategy_rank,
                need,
                package_priority_rank,
            })
            .collect())
    }

    async fn list_active_space_needs(
        &self,
        scenario_id: ScenarioId,
        at: DateTime<Utc>,
    ) -> Result<Vec<SpaceNeed>, PersistenceError> {
        sqlx::query_as::<_, SpaceNeed>(
            r#"SELECT n.* FROM space_needs n
               JOIN missions m ON m.id = n.mission_id
               JOIN mission_packages p ON p.id = m.mission_package_id
               JOIN tasking_orders o ON o.id = p.tasking_order_id
               WHERE o.scenario_id = $1 AND n.start_time <= $2 AND $2 <= n.end_time"#,
        )
        .bind(scenario_id)
        .bind(at)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)
    }

    async fn mark_needs_fulfilled(&self, need_ids: &[SpaceNeedId]) -> Result<(), PersistenceError> {
        let ids: Vec<uuid::Uuid> = need_ids.iter().map(|i| i.0).collect();
        sqlx::query("UPDATE space_needs SET fulfilled = TRUE WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn insert_coverage_windows(
        &self,
        windows: &[SpaceCoverageWindow],
    ) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        for w in windows {
            sqlx::query(
                r#"INSERT INTO space_coverage_windows
                   (id, asset_id, capability_type, "start", "end", max_elevation_deg,
                    center_lat, center_lon, swath_width_km)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                   ON CONFLICT DO NOTHING"#,
            )
            .bind(w.id)
            .bind(w.asset_id)
            .bind(w.capability_type)
            .bind(w.start)
            .bind(w.end)
            .bind(w.max_elevation_deg)
            .bind(w.center_lat)
            .bind(w.center_lon)
            .bind(w.swath_width_km)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }
        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn list_coverage_windows(
        &self,
        scenario_id: ScenarioId,
        since: DateTime<Utc>,
    ) -> Result<Vec<SpaceCoverageWindow>, PersistenceError> {
        sqlx::query_as::<_, SpaceCoverageWindow>(
            r#"SELECT w.* FROM space_coverage_windows w
               JOIN space_assets a ON a.id = w.asset_id
               WHERE a.scenario_id = $1 AND w.end >= $2
               ORDER BY w.start"#,
        )
        .bind(scenario_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)
    }

    // ---- Injects / events ---------------------------------------------------

    async fn create_inject(&self, inject: &ScenarioInject) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"INSERT INTO scenario_injects
               (id, scenario_id, title, description, impact, trigger_day, trigger_hour,
                inject_type, fired, fired_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(inject.id)
        .bind(inject.scenario_id)
        .bind(&inject.title)
        .bind(&inject.description)
        .bind(&inject.impact)
        .bind(inject.trigger_day)
        .bind(inject.trigger_hour)
        .bind(inject.inject_type)
        .bind(inject.fired)
        .bind(inject.fired_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn due_injects(
        &self,
        scenario_id: ScenarioId,
        current_ato_day: i64,
        current_hour_utc: i32,
    ) -> Result<Vec<ScenarioInject>, PersistenceError> {
        sqlx::query_as::<_, ScenarioInject>(
            r#"SELECT * FROM scenario_injects
               WHERE scenario_id = $1 AND fired = FALSE
                 AND (trigger_day < $2 OR (trigger_day = $2 AND trigger_hour <= $3))"#,
        )
        .bind(scenario_id)
        .bind(current_ato_day)
        .bind(current_hour_utc)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)
    }

    async fn mark_inject_fired(
        &self,
        inject_id: ScenarioInjectId,
        fired_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let result = sqlx::query(
            "UPDATE scenario_injects SET fired = TRUE, fired_at = $1 WHERE id = $2",
        )
        .bind(fired_at)
        .bind(inject_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        Ok(())
    }

    async fn append_sim_event(&self, event: &SimEvent) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"INSERT INTO sim_events (id, scenario_id, "time", kind, subject_id, detail)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(event.id)
        .bind(event.scenario_id)
        .bind(event.time)
        .bind(&event.kind)
        .bind(event.subject_id)
        .bind(&event.detail)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn list_sim_events(
        &self,
        scenario_id: ScenarioId,
        up_to: DateTime<Utc>,
    ) -> Result<Vec<SimEvent>, PersistenceError> {
        sqlx::query_as::<_, SimEvent>(
            r#"SELECT * FROM sim_events WHERE scenario_id = $1 AND "time" <= $2 ORDER BY "time""#,
        )
        .bind(scenario_id)
        .bind(up_to)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)
    }

    // ---- Logs ---------------------------------------------------------------

    async fn append_generation_log(&self, log: &GenerationLog) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"INSERT INTO generation_logs
               (id, scenario_id, step, artifact, attempt, status, prompt_tokens,
                output_tokens, output_length, duration_ms, message, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(log.id)
        .bind(log.scenario_id)
        .bind(&log.step)
        .bind(&log.artifact)
        .bind(log.attempt)
        .bind(log.status)
        .bind(log.prompt_tokens)
        .bind(log.output_tokens)
        .bind(log.output_length)
        .bind(log.duration_ms)
        .bind(&log.message)
        .bind(log.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn append_ingest_log(&self, log: &IngestLog) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"INSERT INTO ingest_logs
               (id, scenario_id, input_hash, hierarchy_level, document_type, parent_link_id,
                entity_count, review_flag_count, parse_time_ms, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(log.id)
        .bind(log.scenario_id)
        .bind(&log.input_hash)
        .bind(&log.hierarchy_level)
        .bind(&log.document_type)
        .bind(log.parent_link_id)
        .bind(log.entity_count)
        .bind(log.review_flag_count)
        .bind(log.parse_time_ms)
        .bind(log.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    // ---- Generic lookups -----------------------------------------------------

    async fn get_mission_package(
        &self,
        id: MissionPackageId,
    ) -> Result<MissionPackage, PersistenceError> {
        sqlx::query_as::<_, MissionPackage>("SELECT * FROM mission_packages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?
            .ok_or_else(not_found)
    }

    async fn delete_planning_documents_by_type(
        &self,
        scenario_id: ScenarioId,
        doc_type: PlanningDocType,
    ) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM planning_documents WHERE scenario_id = $1 AND doc_type = $2")
            .bind(scenario_id)
            .bind(doc_type)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn delete_tasking_orders_for_day(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM tasking_orders WHERE scenario_id = $1 AND ato_day_number = $2")
            .bind(scenario_id)
            .bind(ato_day)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn delete_injects(&self, scenario_id: ScenarioId) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM scenario_injects WHERE scenario_id = $1")
            .bind(scenario_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn delete_strategy_documents(&self, scenario_id: ScenarioId) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM strategy_documents WHERE scenario_id = $1")
            .bind(scenario_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn delete_space_assets(&self, scenario_id: ScenarioId) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM space_assets WHERE scenario_id = $1")
            .bind(scenario_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}
