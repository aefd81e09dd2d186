// ==========================================
// 轮岗人员调配系统 - 配额计算器
// ==========================================
// 职责: 汇总分院当日在岗情况，对照岗位配额与员工组约束，
//       输出分院配额状态与三组评分
// 符号约定: Group1/Group2 ≤ 0（缺口取负）, Group3 ≥ 0（超编取正）
// 红线: 当日无医生出诊 → 全零状态
// 红线: 无排班记录 = 不在岗
// 红线: 缓存只返回完整结果，版本号不一致即重新计算
// ==========================================

use crate::domain::types::ScheduleStatus;
use crate::domain::{
    Branch, BranchQuotaStatus, ConstraintSource, GroupShortage, Position, PositionExcess,
    PositionQuota, PositionQuotaStatus, PositionShortage, PresentStaff, Staff, StaffSchedule,
};
use crate::engine::constraint_resolver::{ConstraintResolver, GroupConstraint};
use crate::engine::error::{EngineError, EngineResult, RepositoryContext};
use crate::engine::refresh_queue::SummaryRefreshQueue;
use crate::engine::scenario_calculator::{ScenarioCalculator, ScenarioPlan};
use crate::repository::contracts::{StaffingRepository, SummaryCache};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// ScheduleIndex - 排班索引
// ==========================================
// 同一员工同日多条排班: 取最严格的状态（病假 > 请假 > 休息 > 在岗）
// 计数与缺员名单共用同一索引，保证口径一致
#[derive(Debug, Default, Clone)]
pub struct ScheduleIndex {
    statuses: HashMap<(i64, NaiveDate), ScheduleStatus>,
}

impl ScheduleIndex {
    pub fn build(schedules: &[StaffSchedule]) -> Self {
        let mut statuses: HashMap<(i64, NaiveDate), ScheduleStatus> = HashMap::new();
        for schedule in schedules {
            statuses
                .entry((schedule.staff_id, schedule.schedule_date))
                .and_modify(|current| {
                    if schedule.status.restrictiveness() > current.restrictiveness() {
                        *current = schedule.status;
                    }
                })
                .or_insert(schedule.status);
        }
        Self { statuses }
    }

    pub fn status(&self, staff_id: i64, date: NaiveDate) -> Option<ScheduleStatus> {
        self.statuses.get(&(staff_id, date)).copied()
    }

    pub fn is_working(&self, staff_id: i64, date: NaiveDate) -> bool {
        self.status(staff_id, date)
            .map(|s| s.is_working())
            .unwrap_or(false)
    }
}

// ==========================================
// StatusInputs - 状态计算输入（已批量加载）
// ==========================================
pub struct StatusInputs<'a> {
    pub branch: &'a Branch,
    pub date: NaiveDate,
    pub data_revision: i64,
    pub computed_at: NaiveDateTime,
    pub doctor_count: i32,
    pub doctors: Vec<String>,
    pub quotas: &'a [PositionQuota],
    pub positions: &'a HashMap<i64, Position>,
    pub branch_staff: &'a [Staff],
    pub schedules: &'a ScheduleIndex,
    /// 当日派驻到本院的轮岗员工
    pub rotation_staff: &'a [Staff],
    pub constraint_source: ConstraintSource,
    pub groups: &'a [GroupConstraint],
    pub scenario_plan: Option<&'a ScenarioPlan>,
}

/// 计算分院当日配额状态（纯函数）
pub fn build_status(inputs: StatusInputs<'_>) -> BranchQuotaStatus {
    let StatusInputs {
        branch,
        date,
        data_revision,
        computed_at,
        doctor_count,
        doctors,
        quotas,
        positions,
        branch_staff,
        schedules,
        rotation_staff,
        constraint_source,
        groups,
        scenario_plan,
    } = inputs;

    if doctor_count <= 0 {
        let mut status = BranchQuotaStatus::closed(
            branch.branch_id,
            branch.code.clone(),
            branch.name.clone(),
            date,
            data_revision,
            computed_at,
        );
        status.scenarios_applied = scenario_plan.is_some();
        return status;
    }

    // === 步骤 1: 在岗人员与缺员名单 ===
    let mut present: BTreeMap<i64, PresentStaff> = BTreeMap::new();
    let mut local_by_position: HashMap<i64, i32> = HashMap::new();
    let mut rotation_by_position: HashMap<i64, i32> = HashMap::new();
    let mut missing_by_position: HashMap<i64, BTreeSet<String>> = HashMap::new();

    for staff in branch_staff {
        if schedules.is_working(staff.staff_id, date) {
            *local_by_position.entry(staff.position_id).or_default() += 1;
            present.insert(
                staff.staff_id,
                PresentStaff {
                    staff_id: staff.staff_id,
                    position_id: staff.position_id,
                    nickname: staff.nickname.clone(),
                    via_rotation: false,
                },
            );
        } else {
            missing_by_position
                .entry(staff.position_id)
                .or_default()
                .insert(staff.nickname.clone());
        }
    }

    for staff in rotation_staff {
        if present.contains_key(&staff.staff_id) {
            continue;
        }
        *rotation_by_position.entry(staff.position_id).or_default() += 1;
        present.insert(
            staff.staff_id,
            PresentStaff {
                staff_id: staff.staff_id,
                position_id: staff.position_id,
                nickname: staff.nickname.clone(),
                via_rotation: true,
            },
        );
    }

    let missing_for = |position_id: i64| -> Vec<String> {
        missing_by_position
            .get(&position_id)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    };

    // === 步骤 2: 岗位配额 ===
    let mut sorted_quotas: Vec<&PositionQuota> = quotas.iter().filter(|q| q.is_active).collect();
    sorted_quotas.sort_by_key(|q| q.position_id);

    let mut position_statuses = Vec::with_capacity(sorted_quotas.len());
    for quota in sorted_quotas {
        let position = positions.get(&quota.position_id);
        let (designated_quota, minimum_required, scenario_adjusted) = match scenario_plan {
            Some(plan) => {
                let req = plan.resolve(
                    quota.position_id,
                    quota.designated_quota,
                    quota.minimum_required,
                );
                let adjusted = req.is_adjusted();
                (req.calculated_preferred, req.calculated_minimum, adjusted)
            }
            None => (quota.designated_quota, quota.minimum_required, false),
        };

        let available_local = local_by_position.get(&quota.position_id).copied().unwrap_or(0);
        let assigned_rotation = rotation_by_position
            .get(&quota.position_id)
            .copied()
            .unwrap_or(0);
        let total_assigned = available_local + assigned_rotation;

        position_statuses.push(PositionQuotaStatus {
            position_id: quota.position_id,
            position_name: position
                .map(|p| p.name.clone())
                .unwrap_or_else(|| format!("岗位#{}", quota.position_id)),
            is_branch_bound: position.map(|p| p.is_branch_bound).unwrap_or(true),
            minimum_required,
            designated_quota,
            available_local,
            assigned_rotation,
            total_assigned,
            still_required: (minimum_required - total_assigned).max(0),
            scenario_adjusted,
        });
    }

    // === 步骤 3: Group 1 员工组最低人数 ===
    // 实际人数只累计有启用配额的岗位
    let mut group1_score = 0;
    let mut group1_details = Vec::new();
    for group in groups {
        let actual_count: i32 = position_statuses
            .iter()
            .filter(|p| group.position_ids.contains(&p.position_id))
            .map(|p| p.total_assigned)
            .sum();
        let shortage = (group.requirement.minimum_count - actual_count).max(0);
        group1_score -= shortage;
        if shortage > 0 {
            let mut missing: BTreeSet<String> = BTreeSet::new();
            for pid in &group.position_ids {
                missing.extend(missing_for(*pid));
            }
            group1_details.push(GroupShortage {
                staff_group_id: group.requirement.staff_group_id,
                staff_group_name: group.requirement.staff_group_name.clone(),
                minimum_count: group.requirement.minimum_count,
                actual_count,
                shortage,
                missing_staff: missing.into_iter().collect(),
            });
        }
    }

    // === 步骤 4: Group 2 岗位最低人数 / Group 3 超编 ===
    let mut group2_score = 0;
    let mut group3_score = 0;
    let mut group2_details = Vec::new();
    let mut group3_details = Vec::new();
    for p in &position_statuses {
        let shortage = (p.minimum_required - p.total_assigned).max(0);
        group2_score -= shortage;
        if shortage > 0 {
            group2_details.push(PositionShortage {
                position_id: p.position_id,
                position_name: p.position_name.clone(),
                minimum_required: p.minimum_required,
                total_assigned: p.total_assigned,
                shortage,
                missing_staff: missing_for(p.position_id),
            });
        }

        let excess = (p.total_assigned - p.designated_quota).max(0);
        group3_score += excess;
        if excess > 0 {
            group3_details.push(PositionExcess {
                position_id: p.position_id,
                position_name: p.position_name.clone(),
                designated_quota: p.designated_quota,
                total_assigned: p.total_assigned,
                excess,
            });
        }
    }

    BranchQuotaStatus {
        branch_id: branch.branch_id,
        branch_code: branch.code.clone(),
        branch_name: branch.name.clone(),
        status_date: date,
        is_operational: true,
        doctor_count,
        doctors,
        total_designated: position_statuses.iter().map(|p| p.designated_quota).sum(),
        total_available: position_statuses.iter().map(|p| p.available_local).sum(),
        total_assigned: position_statuses.iter().map(|p| p.total_assigned).sum(),
        total_required: position_statuses.iter().map(|p| p.still_required).sum(),
        positions: position_statuses,
        present_staff: present.into_values().collect(),
        scenarios_applied: scenario_plan.is_some(),
        group1_score,
        group2_score,
        group3_score,
        constraint_source,
        group1_details,
        group2_details,
        group3_details,
        data_revision,
        computed_at,
    }
}

// ==========================================
// QuotaCalculator - 配额计算器
// ==========================================
pub struct QuotaCalculator<R>
where
    R: StaffingRepository,
{
    repo: Arc<R>,
    resolver: ConstraintResolver<R>,
    scenarios: Option<ScenarioCalculator<R>>,
    cache: Option<SummaryCacheBinding>,
}

struct SummaryCacheBinding {
    cache: Arc<dyn SummaryCache>,
    queue: Arc<SummaryRefreshQueue>,
}

impl<R> QuotaCalculator<R>
where
    R: StaffingRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            resolver: ConstraintResolver::new(repo.clone()),
            repo,
            scenarios: None,
            cache: None,
        }
    }

    /// 启用场景调整: 每个配额的目标先经 ScenarioCalculator 解析
    pub fn with_scenarios(mut self) -> Self {
        self.scenarios = Some(ScenarioCalculator::new(self.repo.clone()));
        self
    }

    /// 挂接汇总缓存与回写队列
    pub fn with_cache(mut self, cache: Arc<dyn SummaryCache>, queue: Arc<SummaryRefreshQueue>) -> Self {
        self.cache = Some(SummaryCacheBinding { cache, queue });
        self
    }

    pub fn scenarios_enabled(&self) -> bool {
        self.scenarios.is_some()
    }

    /// 计算分院当日配额状态
    ///
    /// # 流程
    /// 1. 读取分院与当前数据版本号（先于任何事实读取）
    /// 2. 缓存命中（版本号一致）→ 直接返回完整结果
    /// 3. 否则全量计算，并提交回写队列
    #[instrument(skip(self))]
    pub fn calculate_branch_quota_status(
        &self,
        branch_id: i64,
        date: NaiveDate,
    ) -> EngineResult<BranchQuotaStatus> {
        let branch = self
            .repo
            .find_branch(branch_id)
            .context(|| format!("加载分院 branch_id={}", branch_id))?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Branch".to_string(),
                id: branch_id.to_string(),
            })?;

        let revision = self
            .repo
            .current_revision(branch_id)
            .context(|| format!("读取数据版本号 branch_id={}", branch_id))?;

        if let Some(binding) = &self.cache {
            match binding.cache.load_summary(branch_id, date, revision) {
                Ok(Some(cached)) if cached.scenarios_applied == self.scenarios_enabled() => {
                    tracing::debug!(branch_id, %date, revision, "汇总缓存命中");
                    return Ok(cached);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(branch_id, %date, error = %e, "汇总缓存读取失败，改为实时计算");
                }
            }
        }

        let status = self.compute(&branch, date, revision)?;

        if let Some(binding) = &self.cache {
            if let Err(e) = binding.queue.submit(status.clone()) {
                tracing::warn!(branch_id, %date, error = %e, "汇总回写提交失败");
            }
        }

        Ok(status)
    }

    /// 批量计算（分院 × 日期），首个错误即中止
    #[instrument(skip(self, branch_ids), fields(branch_count = branch_ids.len()))]
    pub fn calculate_range(
        &self,
        branch_ids: &[i64],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> EngineResult<Vec<BranchQuotaStatus>> {
        if start_date > end_date {
            return Err(EngineError::ValidationError(format!(
                "日期范围无效: {} > {}",
                start_date, end_date
            )));
        }

        let mut results = Vec::new();
        for date in start_date.iter_days().take_while(|d| *d <= end_date) {
            for branch_id in branch_ids {
                results.push(self.calculate_branch_quota_status(*branch_id, date)?);
            }
        }
        tracing::info!(count = results.len(), "批量配额计算完成");
        Ok(results)
    }

    fn compute(&self, branch: &Branch, date: NaiveDate, revision: i64) -> EngineResult<BranchQuotaStatus> {
        let branch_id = branch.branch_id;
        let computed_at = Local::now().naive_local();

        let doctor_count = self
            .repo
            .count_doctors(branch_id, date)
            .context(|| format!("统计医生人数 branch_id={} date={}", branch_id, date))?;

        if doctor_count == 0 {
            tracing::debug!(branch_id, %date, "当日无医生出诊，分院关闭");
            let mut status = BranchQuotaStatus::closed(
                branch_id,
                branch.code.clone(),
                branch.name.clone(),
                date,
                revision,
                computed_at,
            );
            status.scenarios_applied = self.scenarios_enabled();
            return Ok(status);
        }

        // 医生名单仅用于展示，失败降级为空
        let doctors = match self.repo.find_doctor_assignments(branch_id, date) {
            Ok(list) => list.into_iter().map(|d| d.doctor_name).collect(),
            Err(e) => {
                tracing::warn!(branch_id, %date, error = %e, "医生名单读取失败，展示为空");
                Vec::new()
            }
        };

        // === 批量加载 ===
        let quotas = self
            .repo
            .find_active_quotas(branch_id)
            .context(|| format!("加载岗位配额 branch_id={}", branch_id))?;
        let branch_staff = self
            .repo
            .find_staff_by_branch(branch_id)
            .context(|| format!("加载分院员工 branch_id={}", branch_id))?;
        let assignments = self
            .repo
            .find_rotation_assignments_by_branch(branch_id, date)
            .context(|| format!("加载轮岗派遣 branch_id={} date={}", branch_id, date))?;
        let positions: HashMap<i64, Position> = self
            .repo
            .list_positions()
            .context(|| "加载岗位".to_string())?
            .into_iter()
            .map(|p| (p.position_id, p))
            .collect();

        let staff_ids: Vec<i64> = branch_staff.iter().map(|s| s.staff_id).collect();
        let schedules = self
            .repo
            .find_schedules(&staff_ids, date, date)
            .context(|| format!("加载排班 branch_id={} date={}", branch_id, date))?;
        let schedule_index = ScheduleIndex::build(&schedules);

        let mut rotation_staff = Vec::with_capacity(assignments.len());
        let assigned_ids: BTreeSet<i64> = assignments.iter().map(|a| a.staff_id).collect();
        for staff_id in assigned_ids {
            match self
                .repo
                .find_staff(staff_id)
                .context(|| format!("加载轮岗员工 staff_id={}", staff_id))?
            {
                Some(staff) => rotation_staff.push(staff),
                None => tracing::warn!(branch_id, staff_id, "派遣记录引用的员工不存在，已忽略"),
            }
        }

        // === 员工组约束 ===
        let resolved = self.resolver.resolve(branch, date.weekday())?;
        let groups = self.resolver.expand_groups(&resolved);

        // === 场景 ===
        let plan = match &self.scenarios {
            Some(calculator) => Some(calculator.prepare(branch_id, date)?),
            None => None,
        };

        let status = build_status(StatusInputs {
            branch,
            date,
            data_revision: revision,
            computed_at,
            doctor_count,
            doctors,
            quotas: &quotas,
            positions: &positions,
            branch_staff: &branch_staff,
            schedules: &schedule_index,
            rotation_staff: &rotation_staff,
            constraint_source: resolved.source,
            groups: &groups,
            scenario_plan: plan.as_ref(),
        });

        tracing::debug!(
            branch_id,
            %date,
            group1 = status.group1_score,
            group2 = status.group2_score,
            group3 = status.group3_score,
            total_required = status.total_required,
            "配额状态计算完成"
        );
        Ok(status)
    }
}
