// ==========================================
// 轮岗人员调配系统 - 人员需求场景领域模型
// ==========================================
// 职责: 按优先级匹配的场景规则及其岗位覆写
// 红线: 只取最高优先级的首个命中场景，不合并多个命中
// ==========================================

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

// ==========================================
// StaffRequirementScenario - 人员需求场景
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffRequirementScenario {
    pub scenario_id: i64,
    pub name: String,
    pub priority: i32, // 越大越优先
    pub is_active: bool,

    // ===== 匹配条件 =====
    pub day_of_week: Option<Weekday>,
    pub revenue_tier_id: Option<i64>,
    pub revenue_min: Option<f64>,
    pub revenue_max: Option<f64>,
    pub use_day_of_week_revenue: bool,
    pub use_specific_date_revenue: bool,
    pub doctor_count: Option<i32>,
    pub min_doctor_count: Option<i32>,
}

// ==========================================
// ScenarioPositionRequirement - 场景岗位覆写
// ==========================================
// override_base = true: 替换基准值; false: 在基准值上叠加
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioPositionRequirement {
    pub scenario_id: i64,
    pub position_id: i64,
    pub preferred_staff: i32,
    pub minimum_staff: i32,
    pub override_base: bool,
}

// ==========================================
// CalculatedRequirement - 计算后的人员需求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatedRequirement {
    pub branch_id: i64,
    pub position_id: i64,
    pub requirement_date: NaiveDate,
    pub base_preferred: i32,
    pub base_minimum: i32,
    pub calculated_preferred: i32,
    pub calculated_minimum: i32,
    pub matched_scenario_id: Option<i64>,
    pub matched_scenario_name: Option<String>,
    pub match_reasons: Vec<String>, // 命中原因（审计/界面展示）
}

impl CalculatedRequirement {
    pub fn is_adjusted(&self) -> bool {
        self.calculated_preferred != self.base_preferred
            || self.calculated_minimum != self.base_minimum
    }
}
