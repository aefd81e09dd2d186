use super::{bump_all_revisions, SqliteStaffingRepository};
use crate::domain::types::{weekday_from_db, weekday_to_db, CriterionType, Pillar};
use crate::domain::{AllocationCriterion, ScenarioPositionRequirement, StaffRequirementScenario};
use crate::repository::contracts::RuleReader;
use crate::repository::error::RepositoryResult;
use rusqlite::params;

impl RuleReader for SqliteStaffingRepository {
    fn find_active_criteria(&self) -> RepositoryResult<Vec<AllocationCriterion>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT criterion_id, name, criterion_type, pillar, weight, is_active
            FROM allocation_criterion
            WHERE is_active = 1
            ORDER BY criterion_id
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, i32>(5)? != 0,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut criteria = Vec::with_capacity(rows.len());
        for (criterion_id, name, raw_type, raw_pillar, weight, is_active) in rows {
            let (Some(criterion_type), Some(pillar)) =
                (CriterionType::parse(&raw_type), Pillar::parse(&raw_pillar))
            else {
                tracing::warn!(
                    criterion_id,
                    criterion_type = %raw_type,
                    pillar = %raw_pillar,
                    "评分项类型或支柱无法识别，已跳过"
                );
                continue;
            };
            criteria.push(AllocationCriterion {
                criterion_id,
                name,
                criterion_type,
                pillar,
                weight,
                is_active,
            });
        }
        Ok(criteria)
    }

    fn find_active_scenarios(&self) -> RepositoryResult<Vec<StaffRequirementScenario>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT scenario_id, name, priority, is_active, day_of_week, revenue_tier_id,
                   revenue_min, revenue_max, use_day_of_week_revenue, use_specific_date_revenue,
                   doctor_count, min_doctor_count
            FROM staff_requirement_scenario
            WHERE is_active = 1
            ORDER BY priority DESC, scenario_id ASC
            "#,
        )?;
        let scenarios = stmt
            .query_map([], |row| {
                let dow: Option<i32> = row.get(4)?;
                Ok(StaffRequirementScenario {
                    scenario_id: row.get(0)?,
                    name: row.get(1)?,
                    priority: row.get(2)?,
                    is_active: row.get::<_, i32>(3)? != 0,
                    day_of_week: dow.and_then(weekday_from_db),
                    revenue_tier_id: row.get(5)?,
                    revenue_min: row.get(6)?,
                    revenue_max: row.get(7)?,
                    use_day_of_week_revenue: row.get::<_, i32>(8)? != 0,
                    use_specific_date_revenue: row.get::<_, i32>(9)? != 0,
                    doctor_count: row.get(10)?,
                    min_doctor_count: row.get(11)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(scenarios)
    }

    fn find_scenario_requirements(
        &self,
        scenario_id: i64,
    ) -> RepositoryResult<Vec<ScenarioPositionRequirement>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT scenario_id, position_id, preferred_staff, minimum_staff, override_base
            FROM scenario_position_requirement
            WHERE scenario_id = ?1
            ORDER BY position_id
            "#,
        )?;
        let requirements = stmt
            .query_map(params![scenario_id], |row| {
                Ok(ScenarioPositionRequirement {
                    scenario_id: row.get(0)?,
                    position_id: row.get(1)?,
                    preferred_staff: row.get(2)?,
                    minimum_staff: row.get(3)?,
                    override_base: row.get::<_, i32>(4)? != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(requirements)
    }
}

// ==========================================
// 管理端写入（全局配置，递增全部分院版本号）
// ==========================================
impl SqliteStaffingRepository {
    pub fn insert_criterion(&self, criterion: &AllocationCriterion) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO allocation_criterion (name, criterion_type, pillar, weight, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                criterion.name,
                criterion.criterion_type.as_str(),
                criterion.pillar.as_str(),
                criterion.weight,
                if criterion.is_active { 1 } else { 0 },
            ],
        )?;
        let id = conn.last_insert_rowid();
        bump_all_revisions(&conn)?;
        Ok(id)
    }

    pub fn insert_scenario(&self, scenario: &StaffRequirementScenario) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO staff_requirement_scenario (
                name, priority, is_active, day_of_week, revenue_tier_id, revenue_min, revenue_max,
                use_day_of_week_revenue, use_specific_date_revenue, doctor_count, min_doctor_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                scenario.name,
                scenario.priority,
                if scenario.is_active { 1 } else { 0 },
                scenario.day_of_week.map(weekday_to_db),
                scenario.revenue_tier_id,
                scenario.revenue_min,
                scenario.revenue_max,
                if scenario.use_day_of_week_revenue { 1 } else { 0 },
                if scenario.use_specific_date_revenue { 1 } else { 0 },
                scenario.doctor_count,
                scenario.min_doctor_count,
            ],
        )?;
        let id = conn.last_insert_rowid();
        bump_all_revisions(&conn)?;
        Ok(id)
    }

    pub fn insert_scenario_requirement(
        &self,
        requirement: &ScenarioPositionRequirement,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO scenario_position_requirement
                (scenario_id, position_id, preferred_staff, minimum_staff, override_base)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(scenario_id, position_id) DO UPDATE
               SET preferred_staff = ?3, minimum_staff = ?4, override_base = ?5
            "#,
            params![
                requirement.scenario_id,
                requirement.position_id,
                requirement.preferred_staff,
                requirement.minimum_staff,
                if requirement.override_base { 1 } else { 0 },
            ],
        )?;
        bump_all_revisions(&conn)?;
        Ok(())
    }
}
