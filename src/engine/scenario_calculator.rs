// ==========================================
// 轮岗人员调配系统 - 人员需求场景计算器
// ==========================================
// 职责: 按分院当日上下文（营收档位、星期、医生人数）匹配场景，
//       计算岗位的动态人员目标
// 规则: 场景按 priority 降序遍历，首个命中的场景生效（未定义该岗位时沿用基准值）
// 规则: 无命中时原样返回基准值
// 红线: 所有命中必须输出 reason
// ==========================================

use crate::domain::types::{weekday_label, RevenueSource};
use crate::domain::{
    CalculatedRequirement, RevenueTier, ScenarioPositionRequirement, StaffRequirementScenario,
};
use crate::engine::error::{EngineError, EngineResult, RepositoryContext};
use crate::repository::contracts::{BranchReader, DoctorReader, RuleReader};
use chrono::{Datelike, NaiveDate, Weekday};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// ScenarioContext - 分院当日匹配上下文
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioContext {
    pub day_of_week: Weekday,
    /// 星期基准营收（未配置按 0 计）
    pub baseline_revenue: f64,
    /// 指定日期营收（实际 > 0 优先，否则预计；医生口径分院无日营收时取出诊医生汇总）
    pub specific_date_revenue: Option<f64>,
    pub doctor_count: i32,
}

#[derive(Debug, Clone)]
struct PreparedScenario {
    scenario: StaffRequirementScenario,
    tier: Option<RevenueTier>,
    requirements: Vec<ScenarioPositionRequirement>,
}

// ==========================================
// ScenarioPlan - 已加载的场景集合（分院 × 日期）
// ==========================================
// 用途: 一次加载，多岗位复用
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    branch_id: i64,
    date: NaiveDate,
    context: ScenarioContext,
    scenarios: Vec<PreparedScenario>,
}

impl ScenarioPlan {
    pub fn context(&self) -> &ScenarioContext {
        &self.context
    }

    /// 解析单个岗位的人员目标
    pub fn resolve(
        &self,
        position_id: i64,
        base_preferred: i32,
        base_minimum: i32,
    ) -> CalculatedRequirement {
        let mut result = CalculatedRequirement {
            branch_id: self.branch_id,
            position_id,
            requirement_date: self.date,
            base_preferred,
            base_minimum,
            calculated_preferred: base_preferred,
            calculated_minimum: base_minimum,
            matched_scenario_id: None,
            matched_scenario_name: None,
            match_reasons: Vec::new(),
        };

        for prepared in &self.scenarios {
            let Some(mut reasons) =
                match_scenario(&prepared.scenario, prepared.tier.as_ref(), &self.context)
            else {
                continue;
            };
            reasons.insert(
                0,
                format!(
                    "SCENARIO: {} (priority={})",
                    prepared.scenario.name, prepared.scenario.priority
                ),
            );

            // 首个命中的场景生效，不再继续匹配
            match prepared
                .requirements
                .iter()
                .find(|r| r.position_id == position_id)
            {
                Some(requirement) => {
                    let (preferred, minimum) =
                        apply_requirement(requirement, base_preferred, base_minimum);
                    reasons.push(if requirement.override_base {
                        format!("OVERRIDE: preferred={}, minimum={}", preferred, minimum)
                    } else {
                        format!(
                            "ADJUST: preferred {:+}, minimum {:+}",
                            requirement.preferred_staff, requirement.minimum_staff
                        )
                    });
                    result.calculated_preferred = preferred;
                    result.calculated_minimum = minimum;
                }
                None => reasons.push("NO_OVERRIDE: 场景未定义该岗位，沿用基准值".to_string()),
            }

            result.matched_scenario_id = Some(prepared.scenario.scenario_id);
            result.matched_scenario_name = Some(prepared.scenario.name.clone());
            result.match_reasons = reasons;
            break;
        }

        result
    }
}

/// 应用场景岗位覆写（替换或叠加，结果不小于 0）
fn apply_requirement(
    requirement: &ScenarioPositionRequirement,
    base_preferred: i32,
    base_minimum: i32,
) -> (i32, i32) {
    if requirement.override_base {
        (
            requirement.preferred_staff.max(0),
            requirement.minimum_staff.max(0),
        )
    } else {
        (
            (base_preferred + requirement.preferred_staff).max(0),
            (base_minimum + requirement.minimum_staff).max(0),
        )
    }
}

/// 判断场景是否命中
///
/// # 返回
/// - Some(reasons): 命中，附带逐项命中原因
/// - None: 任一条件不满足
pub fn match_scenario(
    scenario: &StaffRequirementScenario,
    tier: Option<&RevenueTier>,
    context: &ScenarioContext,
) -> Option<Vec<String>> {
    let mut reasons = Vec::new();

    // === 星期 ===
    if let Some(day) = scenario.day_of_week {
        if day != context.day_of_week {
            return None;
        }
        reasons.push(format!("DAY_OF_WEEK: {}", weekday_label(day)));
    }

    // === 营收 ===
    let has_revenue_condition = scenario.revenue_tier_id.is_some()
        || scenario.revenue_min.is_some()
        || scenario.revenue_max.is_some();
    if has_revenue_condition {
        let (revenue, label) = match context.specific_date_revenue {
            Some(specific) if scenario.use_specific_date_revenue => (specific, "当日营收"),
            _ => (context.baseline_revenue, "星期基准营收"),
        };

        if scenario.revenue_tier_id.is_some() {
            // 档位缺失视为不命中
            let tier = tier?;
            if !tier.contains(revenue) {
                return None;
            }
            reasons.push(format!(
                "REVENUE_TIER: {} {:.2} ∈ {} [{:.2}, {})",
                label,
                revenue,
                tier.name,
                tier.min_revenue,
                tier.max_revenue
                    .map(|m| format!("{:.2}", m))
                    .unwrap_or_else(|| "∞".to_string())
            ));
        }

        if scenario.revenue_min.is_some() || scenario.revenue_max.is_some() {
            if let Some(min) = scenario.revenue_min {
                if revenue < min {
                    return None;
                }
            }
            if let Some(max) = scenario.revenue_max {
                if revenue >= max {
                    return None;
                }
            }
            reasons.push(format!(
                "REVENUE_RANGE: {} {:.2} ∈ [{}, {})",
                label,
                revenue,
                scenario
                    .revenue_min
                    .map(|m| format!("{:.2}", m))
                    .unwrap_or_else(|| "-∞".to_string()),
                scenario
                    .revenue_max
                    .map(|m| format!("{:.2}", m))
                    .unwrap_or_else(|| "∞".to_string())
            ));
        }
    }

    // === 医生人数 ===
    if let Some(exact) = scenario.doctor_count {
        if context.doctor_count != exact {
            return None;
        }
        reasons.push(format!("DOCTOR_COUNT: {} = {}", context.doctor_count, exact));
    }
    if let Some(min) = scenario.min_doctor_count {
        if context.doctor_count < min {
            return None;
        }
        reasons.push(format!("MIN_DOCTOR_COUNT: {} ≥ {}", context.doctor_count, min));
    }

    Some(reasons)
}

// ==========================================
// ScenarioCalculator - 场景计算器
// ==========================================
pub struct ScenarioCalculator<R>
where
    R: BranchReader + DoctorReader + RuleReader,
{
    repo: Arc<R>,
}

impl<R> ScenarioCalculator<R>
where
    R: BranchReader + DoctorReader + RuleReader,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// 计算单个岗位的动态人员目标
    ///
    /// # 参数
    /// - branch_id / date / position_id: 目标分院、日期、岗位
    /// - base_preferred / base_minimum: 基准期望编制与最低人数
    #[instrument(skip(self))]
    pub fn calculate_staff_requirements(
        &self,
        branch_id: i64,
        date: NaiveDate,
        position_id: i64,
        base_preferred: i32,
        base_minimum: i32,
    ) -> EngineResult<CalculatedRequirement> {
        let plan = self.prepare(branch_id, date)?;
        let result = plan.resolve(position_id, base_preferred, base_minimum);
        if let Some(name) = &result.matched_scenario_name {
            tracing::debug!(
                branch_id,
                position_id,
                scenario = %name,
                preferred = result.calculated_preferred,
                minimum = result.calculated_minimum,
                "命中人员需求场景"
            );
        }
        Ok(result)
    }

    /// 加载分院当日上下文与全部启用场景
    pub fn prepare(&self, branch_id: i64, date: NaiveDate) -> EngineResult<ScenarioPlan> {
        let context = self.load_context(branch_id, date)?;

        let scenarios = self
            .repo
            .find_active_scenarios()
            .context(|| "加载人员需求场景".to_string())?;

        let mut prepared = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let requirements = self
                .repo
                .find_scenario_requirements(scenario.scenario_id)
                .context(|| format!("加载场景岗位覆写 scenario_id={}", scenario.scenario_id))?;

            let tier = match scenario.revenue_tier_id {
                Some(tier_id) => {
                    let tier = self
                        .repo
                        .find_revenue_tier(tier_id)
                        .context(|| format!("加载营收档位 tier_id={}", tier_id))?;
                    if tier.is_none() {
                        tracing::warn!(
                            scenario_id = scenario.scenario_id,
                            tier_id,
                            "场景引用的营收档位不存在，该场景不会命中"
                        );
                    }
                    tier
                }
                None => None,
            };

            prepared.push(PreparedScenario {
                scenario,
                tier,
                requirements,
            });
        }

        Ok(ScenarioPlan {
            branch_id,
            date,
            context,
            scenarios: prepared,
        })
    }

    /// 解析匹配上下文
    pub fn load_context(&self, branch_id: i64, date: NaiveDate) -> EngineResult<ScenarioContext> {
        let branch = self
            .repo
            .find_branch(branch_id)
            .context(|| format!("加载分院 branch_id={}", branch_id))?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Branch".to_string(),
                id: branch_id.to_string(),
            })?;

        let day_of_week = date.weekday();

        let baseline_revenue = self
            .repo
            .find_branch_revenue(branch_id, day_of_week)
            .context(|| format!("加载星期营收 branch_id={}", branch_id))?
            .map(|r| r.expected_revenue)
            .unwrap_or(0.0);

        let daily = self
            .repo
            .find_branch_daily_revenue(branch_id, date)
            .context(|| format!("加载当日营收 branch_id={} date={}", branch_id, date))?;

        let specific_date_revenue = match daily {
            Some(row) => Some(row.effective_revenue()),
            None if branch.revenue_source == RevenueSource::Doctor => {
                let doctors = self
                    .repo
                    .find_doctor_assignments(branch_id, date)
                    .context(|| format!("加载医生出诊 branch_id={} date={}", branch_id, date))?;
                if doctors.is_empty() {
                    None
                } else {
                    Some(doctors.iter().map(|d| d.expected_revenue).sum())
                }
            }
            None => None,
        };

        let doctor_count = self
            .repo
            .count_doctors(branch_id, date)
            .context(|| format!("统计医生人数 branch_id={} date={}", branch_id, date))?;

        Ok(ScenarioContext {
            day_of_week,
            baseline_revenue,
            specific_date_revenue,
            doctor_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(id: i64, priority: i32) -> StaffRequirementScenario {
        StaffRequirementScenario {
            scenario_id: id,
            name: format!("场景{}", id),
            priority,
            is_active: true,
            day_of_week: None,
            revenue_tier_id: None,
            revenue_min: None,
            revenue_max: None,
            use_day_of_week_revenue: false,
            use_specific_date_revenue: false,
            doctor_count: None,
            min_doctor_count: None,
        }
    }

    fn requirement(scenario_id: i64, preferred: i32, minimum: i32, replace: bool) -> ScenarioPositionRequirement {
        ScenarioPositionRequirement {
            scenario_id,
            position_id: 1,
            preferred_staff: preferred,
            minimum_staff: minimum,
            override_base: replace,
        }
    }

    fn context() -> ScenarioContext {
        ScenarioContext {
            day_of_week: Weekday::Mon,
            baseline_revenue: 75_000.0,
            specific_date_revenue: Some(150_000.0),
            doctor_count: 3,
        }
    }

    fn plan(scenarios: Vec<(StaffRequirementScenario, Option<RevenueTier>, ScenarioPositionRequirement)>) -> ScenarioPlan {
        ScenarioPlan {
            branch_id: 1,
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            context: context(),
            scenarios: scenarios
                .into_iter()
                .map(|(scenario, tier, req)| PreparedScenario {
                    scenario,
                    tier,
                    requirements: vec![req],
                })
                .collect(),
        }
    }

    #[test]
    fn test_highest_priority_match_wins() {
        let p = plan(vec![
            (scenario(1, 10), None, requirement(1, 6, 4, true)),
            (scenario(2, 5), None, requirement(2, 1, 1, false)),
            (scenario(3, 1), None, requirement(3, 9, 9, true)),
        ]);
        let result = p.resolve(1, 3, 2);
        assert_eq!(result.matched_scenario_id, Some(1));
        assert_eq!(result.calculated_preferred, 6);
        assert_eq!(result.calculated_minimum, 4);
    }

    #[test]
    fn test_no_match_returns_base_values() {
        let mut s = scenario(1, 10);
        s.day_of_week = Some(Weekday::Sat);
        let p = plan(vec![(s, None, requirement(1, 6, 4, true))]);
        let result = p.resolve(1, 3, 2);
        assert_eq!(result.matched_scenario_id, None);
        assert_eq!(result.calculated_preferred, 3);
        assert_eq!(result.calculated_minimum, 2);
        assert!(!result.is_adjusted());
        assert!(result.match_reasons.is_empty());
    }

    #[test]
    fn test_additive_adjustment_floors_at_zero() {
        let p = plan(vec![(scenario(1, 10), None, requirement(1, 2, -5, false))]);
        let result = p.resolve(1, 3, 2);
        assert_eq!(result.calculated_preferred, 5);
        assert_eq!(result.calculated_minimum, 0);
    }

    #[test]
    fn test_tier_uses_day_of_week_baseline() {
        let tier = RevenueTier {
            tier_id: 7,
            name: "中档".to_string(),
            min_revenue: 50_000.0,
            max_revenue: Some(100_000.0),
        };
        let mut s = scenario(1, 10);
        s.revenue_tier_id = Some(7);
        s.use_day_of_week_revenue = true;

        // 当日营收 150000 不在档位内，但星期基准 75000 在档位内
        let reasons = match_scenario(&s, Some(&tier), &context()).unwrap();
        assert!(reasons[0].starts_with("REVENUE_TIER"));
    }

    #[test]
    fn test_specific_date_revenue_when_flagged() {
        let mut s = scenario(1, 10);
        s.revenue_min = Some(50_000.0);
        s.revenue_max = Some(100_000.0);
        s.use_specific_date_revenue = true;
        assert!(match_scenario(&s, None, &context()).is_none());

        let mut ctx = context();
        ctx.specific_date_revenue = None;
        // 当日营收不可用时回退星期基准
        assert!(match_scenario(&s, None, &ctx).is_some());
    }

    #[test]
    fn test_direct_range_is_half_open() {
        let mut s = scenario(1, 10);
        s.revenue_min = Some(50_000.0);
        s.revenue_max = Some(75_000.0);
        assert!(match_scenario(&s, None, &context()).is_none());
        s.revenue_max = Some(75_000.01);
        assert!(match_scenario(&s, None, &context()).is_some());
    }

    #[test]
    fn test_missing_tier_never_matches() {
        let mut s = scenario(1, 10);
        s.revenue_tier_id = Some(99);
        assert!(match_scenario(&s, None, &context()).is_none());
    }

    #[test]
    fn test_doctor_count_conditions() {
        let mut s = scenario(1, 10);
        s.doctor_count = Some(3);
        s.min_doctor_count = Some(2);
        let reasons = match_scenario(&s, None, &context()).unwrap();
        assert_eq!(reasons.len(), 2);

        s.min_doctor_count = Some(4);
        assert!(match_scenario(&s, None, &context()).is_none());
    }

    #[test]
    fn test_first_match_without_position_row_keeps_base() {
        let mut other = requirement(1, 9, 9, true);
        other.position_id = 2;
        let p = plan(vec![
            (scenario(1, 10), None, other),
            (scenario(2, 5), None, requirement(2, 1, 1, false)),
        ]);
        let result = p.resolve(1, 3, 2);
        assert_eq!(result.matched_scenario_id, Some(1));
        assert_eq!(result.calculated_preferred, 3);
        assert_eq!(result.calculated_minimum, 2);
        assert!(!result.is_adjusted());
        assert!(result.match_reasons.last().unwrap().starts_with("NO_OVERRIDE"));

        // 该场景定义的岗位照常生效
        let front_desk = p.resolve(2, 3, 2);
        assert_eq!(front_desk.matched_scenario_id, Some(1));
        assert_eq!((front_desk.calculated_preferred, front_desk.calculated_minimum), (9, 9));
    }

    #[test]
    fn test_empty_plan_returns_base_values() {
        let p = plan(vec![]);
        let result = p.resolve(1, 3, 2);
        assert!(result.matched_scenario_id.is_none());
        assert!(!result.is_adjusted());
    }
}
