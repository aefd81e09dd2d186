// ==========================================
// 轮岗人员调配系统 - 医生出诊与偏好领域模型
// ==========================================
// 职责: 医生出诊、医生人员偏好
// 红线: 偏好需求为封闭的带标签变体，写入时校验，读取时不再猜测结构
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// DoctorAssignment - 医生出诊
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorAssignment {
    pub doctor_id: i64,
    pub doctor_name: String,
    pub branch_id: i64,
    pub assignment_date: NaiveDate,
    pub expected_revenue: f64,
}

// ==========================================
// PreferenceRequirement - 偏好需求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreferenceRequirement {
    /// 指定岗位至少 min_count 人在岗
    PositionMinimum { position_id: i64, min_count: i32 },
    /// 指定员工在岗（date 为空表示任意出诊日）
    SpecificStaffOnDate {
        staff_id: i64,
        date: Option<NaiveDate>,
    },
}

impl PreferenceRequirement {
    /// 写入前校验
    pub fn validate(&self) -> Result<(), String> {
        match self {
            PreferenceRequirement::PositionMinimum {
                position_id,
                min_count,
            } => {
                if *position_id <= 0 {
                    return Err(format!("position_id 非法: {}", position_id));
                }
                if *min_count <= 0 {
                    return Err(format!("min_count 必须为正数: {}", min_count));
                }
                Ok(())
            }
            PreferenceRequirement::SpecificStaffOnDate { staff_id, .. } => {
                if *staff_id <= 0 {
                    return Err(format!("staff_id 非法: {}", staff_id));
                }
                Ok(())
            }
        }
    }

    /// 该需求在指定日期是否生效
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match self {
            PreferenceRequirement::SpecificStaffOnDate {
                date: Some(pinned), ..
            } => *pinned == date,
            _ => true,
        }
    }
}

// ==========================================
// DoctorPreference - 医生人员偏好
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorPreference {
    pub preference_id: i64,
    pub doctor_id: i64,
    pub requirement: PreferenceRequirement,
    pub is_active: bool,
}
