// ==========================================
// 轮岗人员调配系统 - 评分项领域模型
// ==========================================
// 职责: 加权评分项（三支柱）与评分结果
// ==========================================

use crate::domain::types::{CriterionType, Pillar};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// AllocationCriterion - 调配评分项
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationCriterion {
    pub criterion_id: i64,
    pub name: String,
    pub criterion_type: CriterionType,
    pub pillar: Pillar,
    pub weight: f64,
    pub is_active: bool,
}

// ==========================================
// CriterionScore - 单项得分
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion_id: i64,
    pub criterion_type: CriterionType,
    pub pillar: Pillar,
    pub weight: f64,
    pub score: f64, // [0, 1]
}

// ==========================================
// AllocationScore - 分院当日综合评分
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationScore {
    pub branch_id: i64,
    pub score_date: NaiveDate,
    pub clinic_wide_score: f64,
    pub doctor_specific_score: f64,
    pub branch_specific_score: f64,
    pub overall_score: f64, // 三支柱算术平均
    pub criterion_scores: Vec<CriterionScore>,
}

impl AllocationScore {
    /// 中性评分（评分失败时的降级值）
    pub fn neutral(branch_id: i64, score_date: NaiveDate) -> Self {
        Self {
            branch_id,
            score_date,
            clinic_wide_score: 0.0,
            doctor_specific_score: 0.0,
            branch_specific_score: 0.0,
            overall_score: 0.0,
            criterion_scores: Vec::new(),
        }
    }
}
