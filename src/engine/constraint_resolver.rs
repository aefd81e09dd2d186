// ==========================================
// 轮岗人员调配系统 - 员工组约束解析器
// ==========================================
// 职责: 解析分院某星期适用的员工组最低人数
// 规则: 分院专属约束（存在且非空）整体替换类别默认约束，不做合并
// ==========================================

use crate::domain::{Branch, ConstraintSource, GroupRequirement, ResolvedConstraints};
use crate::engine::error::{EngineResult, RepositoryContext};
use crate::repository::contracts::QuotaReader;
use chrono::Weekday;
use std::sync::Arc;

// ==========================================
// GroupConstraint - 员工组要求 + 组内岗位
// ==========================================
#[derive(Debug, Clone)]
pub struct GroupConstraint {
    pub requirement: GroupRequirement,
    pub position_ids: Vec<i64>,
}

// ==========================================
// ConstraintResolver
// ==========================================
pub struct ConstraintResolver<R>
where
    R: QuotaReader,
{
    repo: Arc<R>,
}

impl<R> ConstraintResolver<R>
where
    R: QuotaReader,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// 解析分院当日适用的员工组约束
    ///
    /// # 顺序
    /// 1. 分院专属约束（存在且非空）
    /// 2. 分院类别默认约束（存在且非空）
    /// 3. 无约束
    pub fn resolve(&self, branch: &Branch, day_of_week: Weekday) -> EngineResult<ResolvedConstraints> {
        let branch_constraint = self
            .repo
            .find_branch_constraint(branch.branch_id, day_of_week)
            .context(|| format!("加载分院约束 branch_id={}", branch.branch_id))?;

        if let Some(constraint) = branch_constraint {
            if !constraint.requirements.is_empty() {
                return Ok(ResolvedConstraints {
                    source: ConstraintSource::Branch,
                    requirements: constraint.requirements,
                });
            }
        }

        let Some(category_id) = branch.category_id else {
            return Ok(ResolvedConstraints::none());
        };

        let category_constraint = self
            .repo
            .find_category_constraint(category_id, day_of_week)
            .context(|| format!("加载类别约束 category_id={}", category_id))?;

        match category_constraint {
            Some(constraint) if !constraint.requirements.is_empty() => Ok(ResolvedConstraints {
                source: ConstraintSource::Category,
                requirements: constraint.requirements,
            }),
            _ => Ok(ResolvedConstraints::none()),
        }
    }

    /// 展开员工组包含的岗位
    ///
    /// 单个员工组映射读取失败时跳过该约束并告警
    pub fn expand_groups(&self, resolved: &ResolvedConstraints) -> Vec<GroupConstraint> {
        let mut groups = Vec::with_capacity(resolved.requirements.len());
        for requirement in &resolved.requirements {
            match self.repo.find_group_positions(requirement.staff_group_id) {
                Ok(position_ids) => groups.push(GroupConstraint {
                    requirement: requirement.clone(),
                    position_ids,
                }),
                Err(e) => {
                    tracing::warn!(
                        staff_group_id = requirement.staff_group_id,
                        error = %e,
                        "员工组岗位映射读取失败，跳过该约束"
                    );
                }
            }
        }
        groups
    }
}
