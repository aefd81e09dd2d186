// ==========================================
// 轮岗人员调配系统 - 人员领域模型
// ==========================================
// 职责: 岗位、员工、排班、轮岗派遣
// ==========================================

use crate::domain::types::{ScheduleStatus, StaffType};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Position - 岗位
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub position_id: i64,
    pub name: String,
    pub is_branch_bound: bool, // true: 仅通过固定分院配额分配
}

// ==========================================
// Staff - 员工
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub staff_id: i64,
    pub staff_type: StaffType,
    pub position_id: i64,
    pub branch_id: Option<i64>, // 固定分院员工的归属分院
    pub nickname: String,
    pub skill_level: Option<i32>,
    pub is_active: bool,
}

impl Staff {
    pub fn is_rotation(&self) -> bool {
        self.staff_type == StaffType::Rotation
    }
}

// ==========================================
// StaffSchedule - 排班
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffSchedule {
    pub staff_id: i64,
    pub schedule_date: NaiveDate,
    pub status: ScheduleStatus,
}

// ==========================================
// RotationAssignment - 轮岗派遣
// ==========================================
// 唯一键: (staff_id, branch_id, assignment_date)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationAssignment {
    pub assignment_id: i64,
    pub staff_id: i64,
    pub branch_id: i64,
    pub assignment_date: NaiveDate,
    pub assignment_level: i32,
    pub created_at: NaiveDateTime,
}

// ==========================================
// RotationStaffBranch - 轮岗员工可派驻分院
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationStaffBranch {
    pub staff_id: i64,
    pub branch_id: i64,
}
