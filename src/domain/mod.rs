// ==========================================
// 轮岗人员调配系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、状态机
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod branch;
pub mod criteria;
pub mod doctor;
pub mod quota;
pub mod scenario;
pub mod staff;
pub mod status;
pub mod suggestion;
pub mod types;

// 重导出核心类型
pub use branch::{Branch, BranchCategory, BranchDailyRevenue, BranchRevenue, RevenueTier};
pub use criteria::{AllocationCriterion, AllocationScore, CriterionScore};
pub use doctor::{DoctorAssignment, DoctorPreference, PreferenceRequirement};
pub use quota::{
    BranchCategoryConstraint, BranchConstraint, ConstraintSource, GroupRequirement, PositionQuota,
    ResolvedConstraints, StaffGroup,
};
pub use scenario::{CalculatedRequirement, ScenarioPositionRequirement, StaffRequirementScenario};
pub use staff::{Position, RotationAssignment, RotationStaffBranch, Staff, StaffSchedule};
pub use status::{
    BranchQuotaStatus, GroupShortage, PositionExcess, PositionQuotaStatus, PositionShortage,
    PresentStaff,
};
pub use suggestion::{AllocationSuggestion, RankedSuggestion, SuggestionAction};
pub use types::{
    CriterionType, Pillar, RankingCriterion, RevenueSource, ScheduleStatus, StaffType,
    SuggestionStatus,
};
