// ==========================================
// 轮岗人员调配系统 - 数据访问契约
// ==========================================
// 职责: 定义引擎层所需的只读数据访问接口（不包含实现）
// 说明: Engine 层只依赖这些 trait, SQLite 实现见 staffing_repo
// 红线: 契约不含业务逻辑
// ==========================================

use crate::domain::{
    AllocationCriterion, AllocationSuggestion, Branch, BranchCategoryConstraint, BranchConstraint,
    BranchDailyRevenue, BranchQuotaStatus, BranchRevenue, DoctorAssignment, DoctorPreference,
    Position, PositionQuota, RevenueTier, RotationAssignment, ScenarioPositionRequirement, Staff,
    StaffRequirementScenario, StaffSchedule, SuggestionStatus,
};
use crate::repository::error::RepositoryResult;
use chrono::{NaiveDate, NaiveDateTime, Weekday};

// ==========================================
// BranchReader - 分院与营收
// ==========================================
pub trait BranchReader: Send + Sync {
    fn find_branch(&self, branch_id: i64) -> RepositoryResult<Option<Branch>>;

    /// 全部启用分院（按 code 排序）
    fn list_branches(&self) -> RepositoryResult<Vec<Branch>>;

    /// 分院数据版本号（任何影响该分院人员事实的写入都会递增）
    fn current_revision(&self, branch_id: i64) -> RepositoryResult<i64>;

    fn find_branch_revenue(
        &self,
        branch_id: i64,
        day_of_week: Weekday,
    ) -> RepositoryResult<Option<BranchRevenue>>;

    fn find_branch_daily_revenue(
        &self,
        branch_id: i64,
        date: NaiveDate,
    ) -> RepositoryResult<Option<BranchDailyRevenue>>;

    fn find_revenue_tier(&self, tier_id: i64) -> RepositoryResult<Option<RevenueTier>>;
}

// ==========================================
// QuotaReader - 岗位、配额、员工组约束
// ==========================================
pub trait QuotaReader: Send + Sync {
    fn list_positions(&self) -> RepositoryResult<Vec<Position>>;

    /// 分院启用配额（按 position_id 排序）
    fn find_active_quotas(&self, branch_id: i64) -> RepositoryResult<Vec<PositionQuota>>;

    /// 分院专属约束（侧载员工组要求）
    fn find_branch_constraint(
        &self,
        branch_id: i64,
        day_of_week: Weekday,
    ) -> RepositoryResult<Option<BranchConstraint>>;

    /// 分院类别默认约束（侧载员工组要求）
    fn find_category_constraint(
        &self,
        category_id: i64,
        day_of_week: Weekday,
    ) -> RepositoryResult<Option<BranchCategoryConstraint>>;

    /// 员工组包含的岗位 ID
    fn find_group_positions(&self, staff_group_id: i64) -> RepositoryResult<Vec<i64>>;
}

// ==========================================
// StaffReader - 员工、排班、轮岗派遣
// ==========================================
pub trait StaffReader: Send + Sync {
    fn find_staff(&self, staff_id: i64) -> RepositoryResult<Option<Staff>>;

    /// 分院固定员工（按 staff_id 排序）
    fn find_staff_by_branch(&self, branch_id: i64) -> RepositoryResult<Vec<Staff>>;

    /// 可派驻到指定分院、指定岗位的轮岗员工
    fn find_eligible_rotation_staff(
        &self,
        branch_id: i64,
        position_id: i64,
    ) -> RepositoryResult<Vec<Staff>>;

    /// 批量读取排班（一次查询覆盖全部 staff_ids）
    fn find_schedules(
        &self,
        staff_ids: &[i64],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<StaffSchedule>>;

    fn find_rotation_assignments_by_branch(
        &self,
        branch_id: i64,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<RotationAssignment>>;

    fn find_rotation_assignments_by_staff(
        &self,
        staff_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<RotationAssignment>>;
}

// ==========================================
// DoctorReader - 医生出诊与偏好
// ==========================================
pub trait DoctorReader: Send + Sync {
    fn count_doctors(&self, branch_id: i64, date: NaiveDate) -> RepositoryResult<i32>;

    fn find_doctor_assignments(
        &self,
        branch_id: i64,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<DoctorAssignment>>;

    fn find_doctor_preferences(&self, doctor_ids: &[i64]) -> RepositoryResult<Vec<DoctorPreference>>;
}

// ==========================================
// RuleReader - 评分项与需求场景
// ==========================================
pub trait RuleReader: Send + Sync {
    fn find_active_criteria(&self) -> RepositoryResult<Vec<AllocationCriterion>>;

    /// 启用场景（priority 降序, scenario_id 升序）
    fn find_active_scenarios(&self) -> RepositoryResult<Vec<StaffRequirementScenario>>;

    fn find_scenario_requirements(
        &self,
        scenario_id: i64,
    ) -> RepositoryResult<Vec<ScenarioPositionRequirement>>;
}

// ==========================================
// StaffingRepository - 引擎所需读取能力聚合
// ==========================================
pub trait StaffingRepository:
    BranchReader + QuotaReader + StaffReader + DoctorReader + RuleReader
{
}

impl<T> StaffingRepository for T where
    T: BranchReader + QuotaReader + StaffReader + DoctorReader + RuleReader
{
}

// ==========================================
// SummaryCache - 分院当日汇总缓存
// ==========================================
// 红线: 只缓存完整结果; 版本号不一致即视为未命中
pub trait SummaryCache: Send + Sync {
    fn load_summary(
        &self,
        branch_id: i64,
        date: NaiveDate,
        revision: i64,
    ) -> RepositoryResult<Option<BranchQuotaStatus>>;

    /// 原子 upsert 完整结果
    fn store_summary(&self, status: &BranchQuotaStatus) -> RepositoryResult<()>;
}

// ==========================================
// SuggestionRepository - 调配建议持久化
// ==========================================
pub trait SuggestionRepository: Send + Sync {
    fn insert_suggestions(&self, suggestions: &[AllocationSuggestion]) -> RepositoryResult<usize>;

    fn find_suggestion(&self, suggestion_id: &str) -> RepositoryResult<Option<AllocationSuggestion>>;

    fn list_suggestions_by_status(
        &self,
        status: SuggestionStatus,
    ) -> RepositoryResult<Vec<AllocationSuggestion>>;

    /// 批准建议并创建轮岗派遣（同一事务，仅 PENDING 可批准）
    fn approve_suggestion(
        &self,
        suggestion_id: &str,
        reviewer: &str,
        reviewed_at: NaiveDateTime,
    ) -> RepositoryResult<RotationAssignment>;

    /// 驳回建议（仅 PENDING 可驳回）
    fn reject_suggestion(
        &self,
        suggestion_id: &str,
        reviewer: &str,
        note: Option<&str>,
        reviewed_at: NaiveDateTime,
    ) -> RepositoryResult<()>;
}
