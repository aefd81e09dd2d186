// ==========================================
// 轮岗人员调配系统 - 调配建议引擎
// ==========================================
// 职责: 为仍缺人的岗位生成轮岗员工调配建议，并处理审核
// 规则: 候选员工 = 同岗位 + 可派驻该分院 + 当日未派遣 + 本次运行当日未被建议
// 规则: confidence = clamp(综合评分 + 技能等级 × 加成, 0, 1)
// 红线: 状态机 PENDING → APPROVED | REJECTED，其他流转一律报错
// ==========================================

use crate::config::AllocationConfigReader;
use crate::domain::types::SuggestionStatus;
use crate::domain::{AllocationScore, AllocationSuggestion, RotationAssignment, Staff};
use crate::engine::criteria_engine::CriteriaEngine;
use crate::engine::error::{config_value, EngineError, EngineResult, RepositoryContext};
use crate::engine::multi_criteria_filter::dedup_branch_ids;
use crate::engine::quota_calculator::QuotaCalculator;
use crate::repository::contracts::{StaffingRepository, SuggestionRepository};
use chrono::{Local, NaiveDate};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// 建议置信度
pub fn suggestion_confidence(overall_score: f64, skill_level: Option<i32>, bonus_per_level: f64) -> f64 {
    let bonus = f64::from(skill_level.unwrap_or(0).max(0)) * bonus_per_level;
    (overall_score + bonus).clamp(0.0, 1.0)
}

// ==========================================
// SuggestionEngine - 调配建议引擎
// ==========================================
pub struct SuggestionEngine<R, C>
where
    R: StaffingRepository + SuggestionRepository,
    C: AllocationConfigReader,
{
    repo: Arc<R>,
    config: Arc<C>,
    quota: Arc<QuotaCalculator<R>>,
    criteria: Arc<CriteriaEngine<R, C>>,
}

impl<R, C> SuggestionEngine<R, C>
where
    R: StaffingRepository + SuggestionRepository,
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

    /// 生成调配建议（日期范围 × 分院）并持久化
    ///
    /// # 返回
    /// 本次运行生成的全部建议（同一 run_id, 状态 PENDING）
    #[instrument(skip(self, branch_ids), fields(branch_count = branch_ids.len()))]
    pub async fn generate_suggestions(
        &self,
        branch_ids: &[i64],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> EngineResult<Vec<AllocationSuggestion>> {
        if start_date > end_date {
            return Err(EngineError::ValidationError(format!(
                "日期范围无效: {} > {}",
                start_date, end_date
            )));
        }

        let bonus_per_level = config_value(
            self.config.get_skill_bonus_per_level().await,
            "skill_bonus_per_level",
        )?;
        let run_id = Uuid::new_v4().to_string();
        let created_at = Local::now().naive_local();
        let branch_ids = dedup_branch_ids(branch_ids);

        tracing::info!(run_id = %run_id, %start_date, %end_date, "开始生成调配建议");

        let mut proposed: HashMap<NaiveDate, HashSet<i64>> = HashMap::new();
        let mut suggestions = Vec::new();

        for date in start_date.iter_days().take_while(|d| *d <= end_date) {
            for branch_id in &branch_ids {
                let status = self.quota.calculate_branch_quota_status(*branch_id, date)?;
                if !status.is_operational {
                    continue;
                }

                let short_positions: Vec<_> = status
                    .positions
                    .iter()
                    .filter(|p| p.still_required > 0)
                    .collect();
                if short_positions.is_empty() {
                    continue;
                }

                let score = match self.criteria.evaluate_criteria(*branch_id, date).await {
                    Ok(score) => score,
                    Err(e) => {
                        tracing::warn!(branch_id, %date, error = %e, "综合评分失败，置信度按中性评分计算");
                        AllocationScore::neutral(*branch_id, date)
                    }
                };

                for position in short_positions {
                    let taken = proposed.entry(date).or_default();
                    let candidates =
                        self.available_candidates(*branch_id, position.position_id, date, taken)?;

                    for staff in candidates.into_iter().take(position.still_required as usize) {
                        taken.insert(staff.staff_id);
                        suggestions.push(AllocationSuggestion {
                            suggestion_id: Uuid::new_v4().to_string(),
                            run_id: run_id.clone(),
                            staff_id: staff.staff_id,
                            staff_nickname: staff.nickname.clone(),
                            branch_id: *branch_id,
                            position_id: position.position_id,
                            suggestion_date: date,
                            confidence: suggestion_confidence(
                                score.overall_score,
                                staff.skill_level,
                                bonus_per_level,
                            ),
                            reason: format!(
                                "SHORTAGE: {} 仍缺 {} 人 (最低 {}, 当前 {}); SCORE: {:.2}",
                                position.position_name,
                                position.still_required,
                                position.minimum_required,
                                position.total_assigned,
                                score.overall_score
                            ),
                            status: SuggestionStatus::Pending,
                            created_at,
                            reviewed_by: None,
                            reviewed_at: None,
                            review_note: None,
                        });
                    }
                }
            }
        }

        if !suggestions.is_empty() {
            self.repo
                .insert_suggestions(&suggestions)
                .context(|| format!("保存调配建议 run_id={}", run_id))?;
        }

        tracing::info!(run_id = %run_id, count = suggestions.len(), "调配建议生成完成");
        Ok(suggestions)
    }

    /// 批准建议（同时创建轮岗派遣）
    #[instrument(skip(self))]
    pub fn approve_suggestion(
        &self,
        suggestion_id: &str,
        reviewer: &str,
    ) -> EngineResult<RotationAssignment> {
        let reviewer = validate_reviewer(reviewer)?;
        let assignment = self
            .repo
            .approve_suggestion(suggestion_id, reviewer, Local::now().naive_local())
            .context(|| format!("批准调配建议 suggestion_id={}", suggestion_id))?;
        tracing::info!(
            suggestion_id,
            reviewer,
            assignment_id = assignment.assignment_id,
            "调配建议已批准"
        );
        Ok(assignment)
    }

    /// 驳回建议
    #[instrument(skip(self))]
    pub fn reject_suggestion(
        &self,
        suggestion_id: &str,
        reviewer: &str,
        note: Option<&str>,
    ) -> EngineResult<()> {
        let reviewer = validate_reviewer(reviewer)?;
        self.repo
            .reject_suggestion(suggestion_id, reviewer, note, Local::now().naive_local())
            .context(|| format!("驳回调配建议 suggestion_id={}", suggestion_id))?;
        tracing::info!(suggestion_id, reviewer, "调配建议已驳回");
        Ok(())
    }

    pub fn list_suggestions(&self, status: SuggestionStatus) -> EngineResult<Vec<AllocationSuggestion>> {
        self.repo
            .list_suggestions_by_status(status)
            .context(|| format!("加载调配建议 status={}", status))
    }

    /// 可用候选员工（按 staff_id 升序）
    fn available_candidates(
        &self,
        branch_id: i64,
        position_id: i64,
        date: NaiveDate,
        taken: &HashSet<i64>,
    ) -> EngineResult<Vec<Staff>> {
        let eligible = self
            .repo
            .find_eligible_rotation_staff(branch_id, position_id)
            .context(|| {
                format!(
                    "加载候选轮岗员工 branch_id={} position_id={}",
                    branch_id, position_id
                )
            })?;

        let mut available = Vec::with_capacity(eligible.len());
        for staff in eligible {
            if taken.contains(&staff.staff_id) {
                continue;
            }
            let assigned = self
                .repo
                .find_rotation_assignments_by_staff(staff.staff_id, date, date)
                .context(|| format!("加载员工派遣 staff_id={}", staff.staff_id))?;
            if assigned.is_empty() {
                available.push(staff);
            }
        }
        Ok(available)
    }
}

fn validate_reviewer(reviewer: &str) -> EngineResult<&str> {
    let trimmed = reviewer.trim();
    if trimmed.is_empty() {
        return Err(EngineError::ValidationError("审核人不能为空".to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_adds_skill_bonus_and_clamps() {
        assert!((suggestion_confidence(0.5, Some(2), 0.05) - 0.6).abs() < 1e-9);
        assert_eq!(suggestion_confidence(0.98, Some(3), 0.05), 1.0);
        assert_eq!(suggestion_confidence(0.4, None, 0.05), 0.4);
        assert_eq!(suggestion_confidence(-0.2, None, 0.05), 0.0);
    }

    #[test]
    fn test_blank_reviewer_rejected() {
        assert!(matches!(
            validate_reviewer("  "),
            Err(EngineError::ValidationError(_))
        ));
        assert_eq!(validate_reviewer(" 张主管 ").unwrap(), "张主管");
    }
}
