// ==========================================
// 轮岗人员调配系统 - 配额与约束领域模型
// ==========================================
// 职责: 岗位配额、员工组、分院/类别员工组最低人数约束
// 说明: minimum_required ≤ designated_quota 为预期但不保证，引擎不得依赖
// ==========================================

use chrono::Weekday;
use serde::{Deserialize, Serialize};

// ==========================================
// PositionQuota - 岗位配额
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionQuota {
    pub quota_id: i64,
    pub branch_id: i64,
    pub position_id: i64,
    pub minimum_required: i32, // 硬性下限
    pub designated_quota: i32, // 期望编制
    pub is_active: bool,
}

// ==========================================
// StaffGroup - 员工组
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffGroup {
    pub staff_group_id: i64,
    pub name: String,
}

// ==========================================
// GroupRequirement - 员工组最低人数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRequirement {
    pub staff_group_id: i64,
    pub staff_group_name: String,
    pub minimum_count: i32,
}

// ==========================================
// ConstraintSource - 约束来源
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintSource {
    Branch,   // 分院专属约束
    Category, // 分院类别默认约束
    None,     // 无约束
}

// ==========================================
// BranchConstraint - 分院专属约束（按星期）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConstraint {
    pub constraint_id: i64,
    pub branch_id: i64,
    pub day_of_week: Weekday,
    pub requirements: Vec<GroupRequirement>, // 侧载填充
}

// ==========================================
// BranchCategoryConstraint - 分院类别默认约束（按星期）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchCategoryConstraint {
    pub constraint_id: i64,
    pub category_id: i64,
    pub day_of_week: Weekday,
    pub requirements: Vec<GroupRequirement>, // 侧载填充
}

// ==========================================
// ResolvedConstraints - 解析后的当日员工组约束
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedConstraints {
    pub source: ConstraintSource,
    pub requirements: Vec<GroupRequirement>,
}

impl ResolvedConstraints {
    pub fn none() -> Self {
        Self {
            source: ConstraintSource::None,
            requirements: Vec::new(),
        }
    }
}
