// ==========================================
// 轮岗人员调配系统 - 调配建议领域模型
// ==========================================
// 职责: 排名后的人员需求、可派遣的调配建议及其状态机
// 红线: PENDING → APPROVED | REJECTED, 非 PENDING 状态不可再流转
// ==========================================

use crate::domain::types::SuggestionStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ==========================================
// RankedSuggestion - 排名后的人员需求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedSuggestion {
    pub branch_id: i64,
    pub branch_code: String,
    pub branch_name: String,
    pub position_id: i64,
    pub position_name: String,
    pub suggestion_date: NaiveDate,

    // ===== 配额口径 =====
    pub current_count: i32,
    pub minimum_required: i32,
    pub designated_quota: i32,
    pub minimum_shortage: i32,   // minimum - current (可为负)
    pub preferred_shortage: i32, // designated - current (可为负)

    // ===== 排序键 =====
    pub group1_score: i32, // 员工组最低人数缺口（分院共享, ≤ 0）
    pub group2_score: i32, // 岗位最低人数缺口（分院共享, ≤ 0）
    pub group3_score: i32, // 本岗位超编（≥ 0）

    // ===== 展示 =====
    pub legacy_score: f64,
    pub reason: String,
}

impl RankedSuggestion {
    /// 排名比较器
    ///
    /// 依次比较:
    /// 1. group1_score 升序（越负越紧急）
    /// 2. group2_score 升序
    /// 3. group3_score 降序
    /// 4. branch_code 字典序升序（最终决胜）
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.group1_score
            .cmp(&other.group1_score)
            .then_with(|| self.group2_score.cmp(&other.group2_score))
            .then_with(|| other.group3_score.cmp(&self.group3_score))
            .then_with(|| self.branch_code.cmp(&other.branch_code))
    }
}

// ==========================================
// AllocationSuggestion - 调配建议
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSuggestion {
    pub suggestion_id: String,
    pub run_id: String,
    pub staff_id: i64,
    pub staff_nickname: String,
    pub branch_id: i64,
    pub position_id: i64,
    pub suggestion_date: NaiveDate,
    pub confidence: f64, // [0, 1]
    pub reason: String,
    pub status: SuggestionStatus,
    pub created_at: NaiveDateTime,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub review_note: Option<String>,
}

// ==========================================
// SuggestionAction - 审核动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionAction {
    Approve,
    Reject,
}

impl SuggestionAction {
    /// 动作对应的目标状态
    pub fn target(self) -> SuggestionStatus {
        match self {
            SuggestionAction::Approve => SuggestionStatus::Approved,
            SuggestionAction::Reject => SuggestionStatus::Rejected,
        }
    }
}

impl SuggestionStatus {
    /// 状态流转
    ///
    /// # 返回
    /// - `Some(next)`: 合法流转
    /// - `None`: 非法流转（仅 PENDING 可被审核）
    pub fn apply(self, action: SuggestionAction) -> Option<SuggestionStatus> {
        match (self, action) {
            (SuggestionStatus::Pending, SuggestionAction::Approve) => Some(SuggestionStatus::Approved),
            (SuggestionStatus::Pending, SuggestionAction::Reject) => Some(SuggestionStatus::Rejected),
            _ => None,
        }
    }
}
