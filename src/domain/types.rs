// ==========================================
// 轮岗人员调配系统 - 领域类型定义
// ==========================================
// 职责: 枚举类型与数据库字符串之间的统一映射
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 营收口径 (Revenue Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevenueSource {
    Doctor, // 按当日出诊医生的预计营收汇总
    Branch, // 按分院星期营收配置
}

impl RevenueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevenueSource::Doctor => "DOCTOR",
            RevenueSource::Branch => "BRANCH",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "DOCTOR" => RevenueSource::Doctor,
            _ => RevenueSource::Branch,
        }
    }
}

impl fmt::Display for RevenueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 员工类型 (Staff Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffType {
    Branch,   // 固定分院员工
    Rotation, // 轮岗员工
}

impl StaffType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffType::Branch => "BRANCH",
            StaffType::Rotation => "ROTATION",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ROTATION" => StaffType::Rotation,
            _ => StaffType::Branch,
        }
    }
}

impl fmt::Display for StaffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 排班状态 (Schedule Status)
// ==========================================
// 红线: 无排班记录 = 不在岗, 不能当作在岗计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Working,   // 在岗
    Off,       // 休息
    Leave,     // 请假
    SickLeave, // 病假
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Working => "WORKING",
            ScheduleStatus::Off => "OFF",
            ScheduleStatus::Leave => "LEAVE",
            ScheduleStatus::SickLeave => "SICK_LEAVE",
        }
    }

    /// 未知取值按 OFF 处理（宁可少算在岗人数）
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "WORKING" => ScheduleStatus::Working,
            "LEAVE" => ScheduleStatus::Leave,
            "SICK_LEAVE" => ScheduleStatus::SickLeave,
            _ => ScheduleStatus::Off,
        }
    }

    pub fn is_working(&self) -> bool {
        matches!(self, ScheduleStatus::Working)
    }

    /// 限制程度（同日多条排班时取最严格者）
    ///
    /// 病假 > 请假 > 休息 > 在岗
    pub fn restrictiveness(&self) -> u8 {
        match self {
            ScheduleStatus::Working => 0,
            ScheduleStatus::Off => 1,
            ScheduleStatus::Leave => 2,
            ScheduleStatus::SickLeave => 3,
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 评分支柱 (Pillar)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pillar {
    ClinicWide,     // 全院维度
    DoctorSpecific, // 医生维度
    BranchSpecific, // 分院维度
}

impl Pillar {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pillar::ClinicWide => "CLINIC_WIDE",
            Pillar::DoctorSpecific => "DOCTOR_SPECIFIC",
            Pillar::BranchSpecific => "BRANCH_SPECIFIC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CLINIC_WIDE" => Some(Pillar::ClinicWide),
            "DOCTOR_SPECIFIC" => Some(Pillar::DoctorSpecific),
            "BRANCH_SPECIFIC" => Some(Pillar::BranchSpecific),
            _ => None,
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 评分项类型 (Criterion Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriterionType {
    Bookings,                // 预约量（外部预约系统未接入，占位值）
    Revenue,                 // 营收
    MinimumStaffPerPosition, // 岗位最低人数达成率
    MinimumStaffPerBranch,   // 分院最低人数达成率
    DoctorCount,             // 出诊医生人数
}

impl CriterionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionType::Bookings => "BOOKINGS",
            CriterionType::Revenue => "REVENUE",
            CriterionType::MinimumStaffPerPosition => "MINIMUM_STAFF_PER_POSITION",
            CriterionType::MinimumStaffPerBranch => "MINIMUM_STAFF_PER_BRANCH",
            CriterionType::DoctorCount => "DOCTOR_COUNT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BOOKINGS" => Some(CriterionType::Bookings),
            "REVENUE" => Some(CriterionType::Revenue),
            "MINIMUM_STAFF_PER_POSITION" => Some(CriterionType::MinimumStaffPerPosition),
            "MINIMUM_STAFF_PER_BRANCH" => Some(CriterionType::MinimumStaffPerBranch),
            "DOCTOR_COUNT" => Some(CriterionType::DoctorCount),
            _ => None,
        }
    }
}

impl fmt::Display for CriterionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 调配建议状态 (Suggestion Status)
// ==========================================
// 状态机: PENDING → APPROVED | REJECTED, 无回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "PENDING",
            SuggestionStatus::Approved => "APPROVED",
            SuggestionStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "APPROVED" => SuggestionStatus::Approved,
            "REJECTED" => SuggestionStatus::Rejected,
            _ => SuggestionStatus::Pending,
        }
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 排名准则 (Ranking Criterion)
// ==========================================
// 用途: priority_order 声明排名准则，其中仅 DoctorPreference 影响计算
// 说明: 排序键固定为 Group1 → Group2 → Group3 → 分院代码,
//       DoctorPreference 仅作为前置过滤（第零准则）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RankingCriterion {
    DoctorPreference,
    StaffGroupMinimum,
    PositionMinimum,
    PositionPreferred,
}

impl RankingCriterion {
    /// 默认排名准则（不含医生偏好过滤）
    pub fn default_order() -> Vec<RankingCriterion> {
        vec![
            RankingCriterion::StaffGroupMinimum,
            RankingCriterion::PositionMinimum,
            RankingCriterion::PositionPreferred,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RankingCriterion::DoctorPreference => "DOCTOR_PREFERENCE",
            RankingCriterion::StaffGroupMinimum => "STAFF_GROUP_MINIMUM",
            RankingCriterion::PositionMinimum => "POSITION_MINIMUM",
            RankingCriterion::PositionPreferred => "POSITION_PREFERRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DOCTOR_PREFERENCE" => Some(RankingCriterion::DoctorPreference),
            "STAFF_GROUP_MINIMUM" => Some(RankingCriterion::StaffGroupMinimum),
            "POSITION_MINIMUM" => Some(RankingCriterion::PositionMinimum),
            "POSITION_PREFERRED" => Some(RankingCriterion::PositionPreferred),
            _ => None,
        }
    }
}

// ==========================================
// 星期编码
// ==========================================
// 数据库统一存 1..=7 (周一 = 1, 周日 = 7)

pub fn weekday_to_db(day: Weekday) -> i32 {
    day.number_from_monday() as i32
}

pub fn weekday_from_db(value: i32) -> Option<Weekday> {
    match value {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "周一",
        Weekday::Tue => "周二",
        Weekday::Wed => "周三",
        Weekday::Thu => "周四",
        Weekday::Fri => "周五",
        Weekday::Sat => "周六",
        Weekday::Sun => "周日",
    }
}
