// ==========================================
// 轮岗人员调配系统 - 分院配额状态模型
// ==========================================
// 职责: QuotaCalculator 的输出（分院 × 日期）
// 符号约定: group1/group2 ≤ 0（越负越紧急）, group3 ≥ 0（越正越超编）
// 红线: 缺员名单必须为有序序列，保证输出可复现
// ==========================================

use crate::domain::quota::ConstraintSource;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// PositionQuotaStatus - 岗位配额达成情况
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionQuotaStatus {
    pub position_id: i64,
    pub position_name: String,
    pub is_branch_bound: bool,
    pub minimum_required: i32,
    pub designated_quota: i32,
    pub available_local: i32,   // 本院在岗人数
    pub assigned_rotation: i32, // 轮岗派驻人数
    pub total_assigned: i32,
    pub still_required: i32,    // max(minimum - total, 0)
    pub scenario_adjusted: bool,
}

// ==========================================
// GroupShortage - 员工组缺口（Group 1 明细）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupShortage {
    pub staff_group_id: i64,
    pub staff_group_name: String,
    pub minimum_count: i32,
    pub actual_count: i32,
    pub shortage: i32,
    pub missing_staff: Vec<String>,
}

// ==========================================
// PositionShortage - 岗位最低人数缺口（Group 2 明细）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionShortage {
    pub position_id: i64,
    pub position_name: String,
    pub minimum_required: i32,
    pub total_assigned: i32,
    pub shortage: i32,
    pub missing_staff: Vec<String>,
}

// ==========================================
// PositionExcess - 岗位超编（Group 3 明细）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionExcess {
    pub position_id: i64,
    pub position_name: String,
    pub designated_quota: i32,
    pub total_assigned: i32,
    pub excess: i32,
}

// ==========================================
// PresentStaff - 当日在岗人员
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentStaff {
    pub staff_id: i64,
    pub position_id: i64,
    pub nickname: String,
    pub via_rotation: bool, // true: 轮岗派驻; false: 本院排班在岗
}

// ==========================================
// BranchQuotaStatus - 分院当日配额状态
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchQuotaStatus {
    pub branch_id: i64,
    pub branch_code: String,
    pub branch_name: String,
    pub status_date: NaiveDate,

    // ===== 出诊 =====
    pub is_operational: bool,
    pub doctor_count: i32,
    pub doctors: Vec<String>,

    // ===== 岗位明细 =====
    pub positions: Vec<PositionQuotaStatus>,
    pub present_staff: Vec<PresentStaff>, // 按 staff_id 排序
    pub scenarios_applied: bool,          // 岗位目标是否经过场景解析

    // ===== 汇总 =====
    pub total_designated: i32,
    pub total_available: i32,
    pub total_assigned: i32,
    pub total_required: i32,

    // ===== 三组评分 =====
    pub group1_score: i32,
    pub group2_score: i32,
    pub group3_score: i32,
    pub constraint_source: ConstraintSource,
    pub group1_details: Vec<GroupShortage>,
    pub group2_details: Vec<PositionShortage>,
    pub group3_details: Vec<PositionExcess>,

    // ===== 缓存元信息 =====
    pub data_revision: i64,
    pub computed_at: NaiveDateTime,
}

impl BranchQuotaStatus {
    /// 分院关闭（当日无医生出诊）时的全零状态
    pub fn closed(
        branch_id: i64,
        branch_code: String,
        branch_name: String,
        status_date: NaiveDate,
        data_revision: i64,
        computed_at: NaiveDateTime,
    ) -> Self {
        Self {
            branch_id,
            branch_code,
            branch_name,
            status_date,
            is_operational: false,
            doctor_count: 0,
            doctors: Vec::new(),
            positions: Vec::new(),
            present_staff: Vec::new(),
            scenarios_applied: false,
            total_designated: 0,
            total_available: 0,
            total_assigned: 0,
            total_required: 0,
            group1_score: 0,
            group2_score: 0,
            group3_score: 0,
            constraint_source: ConstraintSource::None,
            group1_details: Vec::new(),
            group2_details: Vec::new(),
            group3_details: Vec::new(),
            data_revision,
            computed_at,
        }
    }

    pub fn position(&self, position_id: i64) -> Option<&PositionQuotaStatus> {
        self.positions.iter().find(|p| p.position_id == position_id)
    }

    /// 指定岗位当日在岗人数（含无配额岗位）
    pub fn present_count(&self, position_id: i64) -> i32 {
        self.present_staff
            .iter()
            .filter(|s| s.position_id == position_id)
            .count() as i32
    }

    pub fn is_present(&self, staff_id: i64) -> bool {
        self.present_staff.iter().any(|s| s.staff_id == staff_id)
    }

    /// Group 1 缺员名单（跨员工组去重、排序）
    pub fn group1_missing_staff(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .group1_details
            .iter()
            .flat_map(|g| g.missing_staff.iter().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Group 2 缺员名单（跨岗位去重、排序）
    pub fn group2_missing_staff(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .group2_details
            .iter()
            .flat_map(|p| p.missing_staff.iter().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
