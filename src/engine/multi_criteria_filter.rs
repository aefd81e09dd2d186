// ==========================================
// 轮岗人员调配系统 - 多准则排名过滤器
// ==========================================
// 职责: 生成全局排名的岗位人员需求列表
// 排序: Group1 升序 → Group2 升序 → Group3 降序 → 分院代码升序
// 规则: 医生偏好为第零准则（前置过滤），不参与排序
// 红线: 同一输入必须产出同一序列（稳定排序 + 确定的生成顺序）
// ==========================================

use crate::config::AllocationConfigReader;
use crate::domain::types::RankingCriterion;
use crate::domain::{BranchQuotaStatus, DoctorPreference, PositionQuotaStatus, PreferenceRequirement, RankedSuggestion};
use crate::engine::criteria_engine::CriteriaEngine;
use crate::engine::error::{config_value, EngineResult, RepositoryContext};
use crate::engine::quota_calculator::QuotaCalculator;
use crate::repository::contracts::StaffingRepository;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

/// 旧版综合分（仅展示，不参与排序）
pub fn legacy_score(
    group1_score: i32,
    group2_score: i32,
    minimum_shortage: i32,
    preferred_shortage: i32,
) -> f64 {
    100.0 * f64::from(-group1_score)
        + 10.0 * f64::from(-group2_score)
        + 5.0 * f64::from(minimum_shortage.max(0))
        + f64::from(preferred_shortage.max(0))
}

/// 单条医生偏好在分院当日是否满足
pub fn preference_satisfied(
    requirement: &PreferenceRequirement,
    status: &BranchQuotaStatus,
    date: NaiveDate,
) -> bool {
    if !requirement.applies_on(date) {
        return true;
    }
    match requirement {
        PreferenceRequirement::PositionMinimum {
            position_id,
            min_count,
        } => status.present_count(*position_id) >= *min_count,
        PreferenceRequirement::SpecificStaffOnDate { staff_id, .. } => status.is_present(*staff_id),
    }
}

/// 请求顺序去重（保留首次出现）
pub fn dedup_branch_ids(branch_ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    branch_ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

// ==========================================
// RankingContext - 分院级排名上下文
// ==========================================
struct RankingContext {
    group1_score: i32,
    group2_score: i32,
    high_activity: bool,
    preference_checked: bool,
}

/// 构造单个岗位的排名条目（无缺口返回 None）
fn rank_position(
    status: &BranchQuotaStatus,
    position: &PositionQuotaStatus,
    ctx: &RankingContext,
) -> Option<RankedSuggestion> {
    let current_count = position.total_assigned;
    let minimum_shortage = position.minimum_required - current_count;
    let preferred_shortage = position.designated_quota - current_count;
    if minimum_shortage <= 0 && preferred_shortage <= 0 {
        return None;
    }

    // 只记录正向超编
    let group3_score = (-preferred_shortage).max(0);

    Some(RankedSuggestion {
        branch_id: status.branch_id,
        branch_code: status.branch_code.clone(),
        branch_name: status.branch_name.clone(),
        position_id: position.position_id,
        position_name: position.position_name.clone(),
        suggestion_date: status.status_date,
        current_count,
        minimum_required: position.minimum_required,
        designated_quota: position.designated_quota,
        minimum_shortage,
        preferred_shortage,
        group1_score: ctx.group1_score,
        group2_score: ctx.group2_score,
        group3_score,
        legacy_score: legacy_score(
            ctx.group1_score,
            ctx.group2_score,
            minimum_shortage,
            preferred_shortage,
        ),
        reason: build_reason(position, minimum_shortage, preferred_shortage, ctx),
    })
}

/// 原因串: 主因在前，依次为 低于最低 > 低于期望 > 高活跃 > 员工组缺口 > 医生偏好
fn build_reason(
    position: &PositionQuotaStatus,
    minimum_shortage: i32,
    preferred_shortage: i32,
    ctx: &RankingContext,
) -> String {
    let mut causes = Vec::new();
    if minimum_shortage > 0 {
        causes.push(format!(
            "BELOW_MINIMUM: {} 当前 {} 人, 最低 {} 人",
            position.position_name, position.total_assigned, position.minimum_required
        ));
    }
    if preferred_shortage > 0 {
        causes.push(format!(
            "BELOW_PREFERRED: {} 当前 {} 人, 编制 {} 人",
            position.position_name, position.total_assigned, position.designated_quota
        ));
    }
    if ctx.high_activity {
        causes.push("HIGH_ACTIVITY".to_string());
    }
    if ctx.group1_score < 0 {
        causes.push(format!("STAFF_GROUP_GAP: {}", ctx.group1_score));
    }
    if ctx.preference_checked {
        causes.push("DOCTOR_PREFERENCE: satisfied".to_string());
    }
    causes.join("; ")
}

// ==========================================
// MultiCriteriaFilter - 多准则排名过滤器
// ==========================================
pub struct MultiCriteriaFilter<R, C>
where
    R: StaffingRepository,
    C: AllocationConfigReader,
{
    repo: Arc<R>,
    config: Arc<C>,
    quota: Arc<QuotaCalculator<R>>,
    criteria: Arc<CriteriaEngine<R, C>>,
}

impl<R, C> MultiCriteriaFilter<R, C>
where
    R: StaffingRepository,
    C: AllocationConfigReader,
{
    pub fn new(
        repo: Arc<R>,
        config: Arc<C>,
        quota: Arc<QuotaCalculator<R>>,
        criteria: Arc<CriteriaEngine<R, C>>,
    ) -> Self {
        Self {
            repo,
            config,
            quota,
            criteria,
        }
    }

    /// 使用配置中的默认准则生成排名
    pub async fn generate_with_defaults(
        &self,
        branch_ids: &[i64],
        date: NaiveDate,
    ) -> EngineResult<Vec<RankedSuggestion>> {
        let priority_order = config_value(
            self.config.get_default_priority_order().await,
            "default_priority_order",
        )?;
        let enable_preferences = config_value(
            self.config.get_enable_doctor_preferences().await,
            "enable_doctor_preferences",
        )?;
        self.generate_ranked_suggestions(branch_ids, date, &priority_order, enable_preferences)
            .await
    }

    /// 生成全局排名
    ///
    /// # 参数
    /// - branch_ids: 参与排名的分院（请求顺序，重复项只保留首个）
    /// - priority_order: 启用的排名准则（仅决定是否包含医生偏好前置过滤）
    /// - enable_doctor_preferences: 是否启用医生偏好前置过滤
    ///
    /// # 说明
    /// 各组分数始终取自分院汇总，排序比较器固定
    #[instrument(skip(self, branch_ids, priority_order), fields(branch_count = branch_ids.len()))]
    pub async fn generate_ranked_suggestions(
        &self,
        branch_ids: &[i64],
        date: NaiveDate,
        priority_order: &[RankingCriterion],
        enable_doctor_preferences: bool,
    ) -> EngineResult<Vec<RankedSuggestion>> {
        let check_preferences = enable_doctor_preferences
            && priority_order.contains(&RankingCriterion::DoctorPreference);

        let mut suggestions = Vec::new();
        for branch_id in dedup_branch_ids(branch_ids) {
            let status = self.quota.calculate_branch_quota_status(branch_id, date)?;
            if !status.is_operational {
                tracing::debug!(branch_id, %date, "分院当日未营业，跳过");
                continue;
            }

            if check_preferences && !self.preferences_satisfied(&status, date) {
                tracing::debug!(branch_id, %date, "医生偏好未满足，分院被过滤");
                continue;
            }

            let ctx = RankingContext {
                group1_score: status.group1_score,
                group2_score: status.group2_score,
                high_activity: self.criteria.is_high_activity(branch_id, date).await,
                preference_checked: check_preferences,
            };

            suggestions.extend(
                status
                    .positions
                    .iter()
                    .filter(|p| p.is_branch_bound)
                    .filter_map(|p| rank_position(&status, p, &ctx)),
            );
        }

        suggestions.sort_by(|a, b| a.rank_cmp(b));
        tracing::info!(%date, count = suggestions.len(), "全局排名生成完成");
        Ok(suggestions)
    }

    /// 分院当日全部出诊医生的偏好是否满足
    ///
    /// 偏好读取失败降级为"无偏好"（不过滤）
    fn preferences_satisfied(&self, status: &BranchQuotaStatus, date: NaiveDate) -> bool {
        match self.load_preferences(status.branch_id, date) {
            Ok(preferences) => preferences
                .iter()
                .all(|p| preference_satisfied(&p.requirement, status, date)),
            Err(e) => {
                tracing::warn!(
                    branch_id = status.branch_id,
                    %date,
                    error = %e,
                    "医生偏好读取失败，按无偏好处理"
                );
                true
            }
        }
    }

    fn load_preferences(&self, branch_id: i64, date: NaiveDate) -> EngineResult<Vec<DoctorPreference>> {
        let doctors = self
            .repo
            .find_doctor_assignments(branch_id, date)
            .context(|| format!("加载出诊医生 branch_id={}", branch_id))?;
        let mut doctor_ids: Vec<i64> = doctors.iter().map(|d| d.doctor_id).collect();
        doctor_ids.sort_unstable();
        doctor_ids.dedup();
        if doctor_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.repo
            .find_doctor_preferences(&doctor_ids)
            .context(|| format!("加载医生偏好 branch_id={}", branch_id))
    }
}
