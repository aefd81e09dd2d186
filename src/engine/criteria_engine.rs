// ==========================================
// 轮岗人员调配系统 - 加权评分引擎
// ==========================================
// 职责: 按三支柱（全院 / 医生 / 分院）计算分院当日综合评分
// 规则: 支柱内按权重归一化平均; 综合评分 = 三支柱算术平均
// 规则: 无评分项或权重和为 0 的支柱记 0.0
// 红线: 单个评分项失败 → 跳过并告警，不影响其他评分项
// ==========================================

use crate::config::AllocationConfigReader;
use crate::domain::types::{CriterionType, Pillar, RevenueSource};
use crate::domain::{
    AllocationCriterion, AllocationScore, Branch, BranchQuotaStatus, CriterionScore,
    PositionQuotaStatus,
};
use crate::engine::error::{config_value, EngineError, EngineResult, RepositoryContext};
use crate::engine::quota_calculator::QuotaCalculator;
use crate::repository::contracts::StaffingRepository;
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// 纯评分函数
// ==========================================

/// 营收评分: revenue / ceiling，截断到 [0, 1]
pub fn revenue_score(revenue: f64, ceiling: f64) -> f64 {
    if ceiling <= 0.0 {
        return 0.0;
    }
    (revenue / ceiling).clamp(0.0, 1.0)
}

/// 医生人数评分: count / max，截断到 [0, 1]
pub fn doctor_count_score(doctor_count: i32, max_doctor_count: i32) -> f64 {
    if max_doctor_count <= 0 {
        return 0.0;
    }
    (doctor_count as f64 / max_doctor_count as f64).clamp(0.0, 1.0)
}

/// 最低人数达成率: 各启用配额 min(在岗 / 最低, 1) 的平均值
///
/// 岗位口径与分院口径共用; 最低人数为 0 的配额记 1.0, 无配额记 1.0
pub fn quota_fulfillment(positions: &[PositionQuotaStatus]) -> f64 {
    if positions.is_empty() {
        return 1.0;
    }
    let total: f64 = positions
        .iter()
        .map(|p| {
            if p.minimum_required <= 0 {
                1.0
            } else {
                (p.total_assigned as f64 / p.minimum_required as f64).min(1.0)
            }
        })
        .sum();
    total / positions.len() as f64
}

/// 支柱得分: Σ(weight × score) / Σ weight
pub fn pillar_score(scores: &[CriterionScore], pillar: Pillar) -> f64 {
    let (weighted, weight) = scores
        .iter()
        .filter(|s| s.pillar == pillar)
        .fold((0.0, 0.0), |(ws, w), s| (ws + s.weight * s.score, w + s.weight));
    if weight <= 0.0 {
        return 0.0;
    }
    weighted / weight
}

/// 汇总为分院综合评分
pub fn aggregate_scores(
    branch_id: i64,
    score_date: NaiveDate,
    criterion_scores: Vec<CriterionScore>,
) -> AllocationScore {
    let clinic_wide_score = pillar_score(&criterion_scores, Pillar::ClinicWide);
    let doctor_specific_score = pillar_score(&criterion_scores, Pillar::DoctorSpecific);
    let branch_specific_score = pillar_score(&criterion_scores, Pillar::BranchSpecific);

    AllocationScore {
        branch_id,
        score_date,
        clinic_wide_score,
        doctor_specific_score,
        branch_specific_score,
        overall_score: (clinic_wide_score + doctor_specific_score + branch_specific_score) / 3.0,
        criterion_scores,
    }
}

// ==========================================
// 评分参数（单次评估内读取一次）
// ==========================================
#[derive(Debug, Clone, Copy)]
struct ScoringParams {
    bookings_placeholder: f64,
    revenue_ceiling: f64,
    max_doctor_count: i32,
}

// 按需加载的分院当日事实
struct ScoringFacts<'a> {
    branch: &'a Branch,
    date: NaiveDate,
    status: Option<BranchQuotaStatus>,
}

// ==========================================
// CriteriaEngine - 加权评分引擎
// ==========================================
pub struct CriteriaEngine<R, C>
where
    R: StaffingRepository,
    C: AllocationConfigReader,
{
    repo: Arc<R>,
    config: Arc<C>,
    quota: Arc<QuotaCalculator<R>>,
}

impl<R, C> CriteriaEngine<R, C>
where
    R: StaffingRepository,
    C: AllocationConfigReader,
{
    pub fn new(repo: Arc<R>, config: Arc<C>, quota: Arc<QuotaCalculator<R>>) -> Self {
        Self { repo, config, quota }
    }

    /// 计算分院当日综合评分
    #[instrument(skip(self))]
    pub async fn evaluate_criteria(
        &self,
        branch_id: i64,
        date: NaiveDate,
    ) -> EngineResult<AllocationScore> {
        let branch = self
            .repo
            .find_branch(branch_id)
            .context(|| format!("加载分院 branch_id={}", branch_id))?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Branch".to_string(),
                id: branch_id.to_string(),
            })?;

        let criteria = self
            .repo
            .find_active_criteria()
            .context(|| "加载评分项".to_string())?;

        let params = ScoringParams {
            bookings_placeholder: config_value(
                self.config.get_bookings_placeholder_score().await,
                "bookings_placeholder_score",
            )?,
            revenue_ceiling: config_value(self.config.get_revenue_ceiling().await, "revenue_ceiling")?,
            max_doctor_count: config_value(
                self.config.get_max_doctor_count().await,
                "max_doctor_count",
            )?,
        };

        let mut facts = ScoringFacts {
            branch: &branch,
            date,
            status: None,
        };

        let mut criterion_scores = Vec::with_capacity(criteria.len());
        for criterion in &criteria {
            match self.score_criterion(criterion, &params, &mut facts) {
                Ok(score) => criterion_scores.push(CriterionScore {
                    criterion_id: criterion.criterion_id,
                    criterion_type: criterion.criterion_type,
                    pillar: criterion.pillar,
                    weight: criterion.weight,
                    score,
                }),
                Err(e) => {
                    tracing::warn!(
                        branch_id,
                        %date,
                        criterion_id = criterion.criterion_id,
                        criterion_type = %criterion.criterion_type,
                        error = %e,
                        "评分项计算失败，已跳过"
                    );
                }
            }
        }

        let score = aggregate_scores(branch_id, date, criterion_scores);
        tracing::debug!(
            branch_id,
            %date,
            overall = score.overall_score,
            clinic_wide = score.clinic_wide_score,
            doctor_specific = score.doctor_specific_score,
            branch_specific = score.branch_specific_score,
            "综合评分完成"
        );
        Ok(score)
    }

    /// 批量评分（分院 × 日期），首个错误即中止
    #[instrument(skip(self, branch_ids), fields(branch_count = branch_ids.len()))]
    pub async fn evaluate_range(
        &self,
        branch_ids: &[i64],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> EngineResult<Vec<AllocationScore>> {
        if start_date > end_date {
            return Err(EngineError::ValidationError(format!(
                "日期范围无效: {} > {}",
                start_date, end_date
            )));
        }

        let mut scores = Vec::new();
        for date in start_date.iter_days().take_while(|d| *d <= end_date) {
            for branch_id in branch_ids {
                scores.push(self.evaluate_criteria(*branch_id, date).await?);
            }
        }
        Ok(scores)
    }

    /// 分院当日是否高活跃（综合评分 ≥ 阈值）
    ///
    /// 评分失败降级为"非高活跃"
    pub async fn is_high_activity(&self, branch_id: i64, date: NaiveDate) -> bool {
        let threshold = match self.config.get_high_activity_threshold().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "高活跃阈值读取失败，按非高活跃处理");
                return false;
            }
        };
        match self.evaluate_criteria(branch_id, date).await {
            Ok(score) => score.overall_score >= threshold,
            Err(e) => {
                tracing::warn!(branch_id, %date, error = %e, "综合评分失败，按非高活跃处理");
                false
            }
        }
    }

    fn score_criterion(
        &self,
        criterion: &AllocationCriterion,
        params: &ScoringParams,
        facts: &mut ScoringFacts<'_>,
    ) -> EngineResult<f64> {
        let branch_id = facts.branch.branch_id;
        let date = facts.date;
        match criterion.criterion_type {
            CriterionType::Bookings => Ok(params.bookings_placeholder.clamp(0.0, 1.0)),
            CriterionType::Revenue => {
                let revenue = self.load_revenue(facts.branch, date)?;
                Ok(revenue_score(revenue, params.revenue_ceiling))
            }
            CriterionType::DoctorCount => {
                let count = self
                    .repo
                    .count_doctors(branch_id, date)
                    .context(|| format!("统计医生人数 branch_id={}", branch_id))?;
                Ok(doctor_count_score(count, params.max_doctor_count))
            }
            CriterionType::MinimumStaffPerPosition | CriterionType::MinimumStaffPerBranch => {
                let status = self.load_status(facts)?;
                Ok(quota_fulfillment(&status.positions))
            }
        }
    }

    fn load_status<'f>(&self, facts: &'f mut ScoringFacts<'_>) -> EngineResult<&'f BranchQuotaStatus> {
        if facts.status.is_none() {
            let status = self
                .quota
                .calculate_branch_quota_status(facts.branch.branch_id, facts.date)?;
            facts.status = Some(status);
        }
        facts.status.as_ref().ok_or_else(|| {
            EngineError::Other(anyhow::anyhow!(
                "配额状态缺失 branch_id={}",
                facts.branch.branch_id
            ))
        })
    }

    /// 当日营收: 医生口径取出诊医生预计营收之和，否则取星期基准营收（未配置按 0）
    fn load_revenue(&self, branch: &Branch, date: NaiveDate) -> EngineResult<f64> {
        match branch.revenue_source {
            RevenueSource::Doctor => {
                let doctors = self
                    .repo
                    .find_doctor_assignments(branch.branch_id, date)
                    .context(|| format!("加载医生营收 branch_id={}", branch.branch_id))?;
                Ok(doctors.iter().map(|d| d.expected_revenue).sum())
            }
            RevenueSource::Branch => Ok(self
                .repo
                .find_branch_revenue(branch.branch_id, date.weekday())
                .context(|| format!("加载星期营收 branch_id={}", branch.branch_id))?
                .map(|r| r.expected_revenue)
                .unwrap_or(0.0)),
        }
    }
}
