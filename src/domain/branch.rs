// ==========================================
// 轮岗人员调配系统 - 分院领域模型
// ==========================================
// 职责: 分院、分院类别、营收配置
// 红线: 当日无医生出诊的分院视为关闭，需求为零
// ==========================================

use crate::domain::types::RevenueSource;
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

// ==========================================
// Branch - 分院
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub branch_id: i64,
    pub code: String,                  // 分院代码（排序最终决胜键）
    pub name: String,
    pub category_id: Option<i64>,      // 分院类别（约束默认值来源）
    pub revenue_source: RevenueSource, // 营收口径
    pub is_active: bool,
}

// ==========================================
// BranchCategory - 分院类别
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchCategory {
    pub category_id: i64,
    pub name: String,
}

// ==========================================
// BranchRevenue - 分院星期基准营收
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRevenue {
    pub branch_id: i64,
    pub day_of_week: Weekday,
    pub expected_revenue: f64,
}

// ==========================================
// BranchDailyRevenue - 分院指定日期营收
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchDailyRevenue {
    pub branch_id: i64,
    pub revenue_date: NaiveDate,
    pub expected_revenue: f64,
    pub actual_revenue: Option<f64>,
}

impl BranchDailyRevenue {
    /// 实际营收为正时优先，否则回退预计营收
    pub fn effective_revenue(&self) -> f64 {
        match self.actual_revenue {
            Some(actual) if actual > 0.0 => actual,
            _ => self.expected_revenue,
        }
    }
}

// ==========================================
// RevenueTier - 营收档位
// ==========================================
// 区间语义: 左闭右开 [min, max), max 缺省表示无上限
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueTier {
    pub tier_id: i64,
    pub name: String,
    pub min_revenue: f64,
    pub max_revenue: Option<f64>,
}

impl RevenueTier {
    pub fn contains(&self, revenue: f64) -> bool {
        if revenue < self.min_revenue {
            return false;
        }
        match self.max_revenue {
            Some(max) => revenue < max,
            None => true,
        }
    }
}
