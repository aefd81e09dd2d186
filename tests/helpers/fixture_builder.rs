// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================
// 职责: 在内存库 / 临时文件库中写入分院、岗位、员工、排班、医生等测试数据
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rotation_allocation::db;
use rotation_allocation::domain::types::{
    CriterionType, Pillar, RevenueSource, ScheduleStatus, StaffType,
};
use rotation_allocation::domain::{
    AllocationCriterion, Branch, BranchCategory, BranchDailyRevenue, BranchRevenue, Position,
    PositionQuota, PreferenceRequirement, RevenueTier, ScenarioPositionRequirement, Staff,
    StaffGroup, StaffRequirementScenario, StaffSchedule,
};
use rotation_allocation::repository::SqliteStaffingRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 测试基准日期（周一）
pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

// ==========================================
// Fixture - 测试数据库
// ==========================================
pub struct Fixture {
    pub conn: Arc<Mutex<Connection>>,
    pub repo: Arc<SqliteStaffingRepository>,
    _temp_file: Option<NamedTempFile>,
}

impl Fixture {
    /// 内存库
    pub fn in_memory() -> Self {
        let conn = Arc::new(Mutex::new(db::open_in_memory().unwrap()));
        let repo = Arc::new(SqliteStaffingRepository::from_connection(conn.clone()).unwrap());
        Self {
            conn,
            repo,
            _temp_file: None,
        }
    }

    /// 临时文件库（需保持 Fixture 存活）
    pub fn on_disk() -> Self {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();
        let conn = db::open_sqlite_connection(&db_path).unwrap();
        db::init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let repo = Arc::new(SqliteStaffingRepository::from_connection(conn.clone()).unwrap());
        Self {
            conn,
            repo,
            _temp_file: Some(temp_file),
        }
    }

    // ===== 分院 =====

    pub fn category(&self, category_id: i64, name: &str) -> &Self {
        self.repo
            .insert_category(&BranchCategory {
                category_id,
                name: name.to_string(),
            })
            .unwrap();
        self
    }

    pub fn branch(&self, branch_id: i64, code: &str) -> &Self {
        self.insert_branch(branch_id, code, None, RevenueSource::Branch)
    }

    pub fn branch_in_category(&self, branch_id: i64, code: &str, category_id: i64) -> &Self {
        self.insert_branch(branch_id, code, Some(category_id), RevenueSource::Branch)
    }

    pub fn doctor_revenue_branch(&self, branch_id: i64, code: &str) -> &Self {
        self.insert_branch(branch_id, code, None, RevenueSource::Doctor)
    }

    fn insert_branch(
        &self,
        branch_id: i64,
        code: &str,
        category_id: Option<i64>,
        revenue_source: RevenueSource,
    ) -> &Self {
        self.repo
            .insert_branch(&Branch {
                branch_id,
                code: code.to_string(),
                name: format!("{}分院", code),
                category_id,
                revenue_source,
                is_active: true,
            })
            .unwrap();
        self
    }

    pub fn weekday_revenue(&self, branch_id: i64, date: NaiveDate, revenue: f64) -> &Self {
        use chrono::Datelike;
        self.repo
            .upsert_branch_revenue(&BranchRevenue {
                branch_id,
                day_of_week: date.weekday(),
                expected_revenue: revenue,
            })
            .unwrap();
        self
    }

    pub fn daily_revenue(&self, branch_id: i64, date: NaiveDate, expected: f64, actual: Option<f64>) -> &Self {
        self.repo
            .upsert_branch_daily_revenue(&BranchDailyRevenue {
                branch_id,
                revenue_date: date,
                expected_revenue: expected,
                actual_revenue: actual,
            })
            .unwrap();
        self
    }

    pub fn revenue_tier(&self, tier_id: i64, min: f64, max: Option<f64>) -> &Self {
        self.repo
            .insert_revenue_tier(&RevenueTier {
                tier_id,
                name: format!("档位{}", tier_id),
                min_revenue: min,
                max_revenue: max,
            })
            .unwrap();
        self
    }

    // ===== 岗位与配额 =====

    pub fn position(&self, position_id: i64, name: &str) -> &Self {
        self.insert_position(position_id, name, true)
    }

    pub fn floating_position(&self, position_id: i64, name: &str) -> &Self {
        self.insert_position(position_id, name, false)
    }

    fn insert_position(&self, position_id: i64, name: &str, is_branch_bound: bool) -> &Self {
        self.repo
            .insert_position(&Position {
                position_id,
                name: name.to_string(),
                is_branch_bound,
            })
            .unwrap();
        self
    }

    pub fn quota(&self, branch_id: i64, position_id: i64, minimum: i32, designated: i32) -> &Self {
        self.repo
            .upsert_quota(&PositionQuota {
                quota_id: 0,
                branch_id,
                position_id,
                minimum_required: minimum,
                designated_quota: designated,
                is_active: true,
            })
            .unwrap();
        self
    }

    pub fn group(&self, staff_group_id: i64, name: &str, position_ids: &[i64]) -> &Self {
        self.repo
            .insert_staff_group(
                &StaffGroup {
                    staff_group_id,
                    name: name.to_string(),
                },
                position_ids,
            )
            .unwrap();
        self
    }

    pub fn branch_constraint(&self, branch_id: i64, date: NaiveDate, requirements: &[(i64, i32)]) -> &Self {
        use chrono::Datelike;
        self.repo
            .upsert_branch_constraint(branch_id, date.weekday(), requirements)
            .unwrap();
        self
    }

    // ===== 员工 =====

    pub fn branch_staff(&self, staff_id: i64, branch_id: i64, position_id: i64, nickname: &str) -> &Self {
        self.repo
            .insert_staff(&Staff {
                staff_id,
                staff_type: StaffType::Branch,
                position_id,
                branch_id: Some(branch_id),
                nickname: nickname.to_string(),
                skill_level: None,
                is_active: true,
            })
            .unwrap();
        self
    }

    pub fn rotation_staff(
        &self,
        staff_id: i64,
        position_id: i64,
        nickname: &str,
        skill_level: Option<i32>,
        branch_ids: &[i64],
    ) -> &Self {
        self.repo
            .insert_staff(&Staff {
                staff_id,
                staff_type: StaffType::Rotation,
                position_id,
                branch_id: None,
                nickname: nickname.to_string(),
                skill_level,
                is_active: true,
            })
            .unwrap();
        for branch_id in branch_ids {
            self.repo.add_rotation_branch(staff_id, *branch_id).unwrap();
        }
        self
    }

    pub fn schedule(&self, staff_id: i64, date: NaiveDate, status: ScheduleStatus) -> &Self {
        self.repo
            .insert_schedule(&StaffSchedule {
                staff_id,
                schedule_date: date,
                status,
            })
            .unwrap();
        self
    }

    pub fn working(&self, staff_ids: &[i64], date: NaiveDate) -> &Self {
        for staff_id in staff_ids {
            self.schedule(*staff_id, date, ScheduleStatus::Working);
        }
        self
    }

    pub fn assign(&self, staff_id: i64, branch_id: i64, date: NaiveDate) -> &Self {
        self.repo
            .insert_rotation_assignment(staff_id, branch_id, date, 1, NaiveDateTime::default())
            .unwrap();
        self
    }

    // ===== 医生 =====

    pub fn doctor(&self, doctor_id: i64, name: &str) -> &Self {
        self.repo.insert_doctor(doctor_id, name).unwrap();
        self
    }

    pub fn doctor_on(&self, doctor_id: i64, branch_id: i64, date: NaiveDate, revenue: f64) -> &Self {
        self.repo
            .insert_doctor_assignment(doctor_id, branch_id, date, revenue)
            .unwrap();
        self
    }

    pub fn doctor_preference(&self, doctor_id: i64, requirement: PreferenceRequirement) -> &Self {
        self.repo
            .insert_doctor_preference(doctor_id, &requirement)
            .unwrap();
        self
    }

    // ===== 评分项与场景 =====

    pub fn criterion(&self, criterion_type: CriterionType, pillar: Pillar, weight: f64) -> &Self {
        self.repo
            .insert_criterion(&AllocationCriterion {
                criterion_id: 0,
                name: criterion_type.as_str().to_lowercase(),
                criterion_type,
                pillar,
                weight,
                is_active: true,
            })
            .unwrap();
        self
    }

    /// 新增场景并返回 scenario_id
    pub fn scenario(&self, scenario: StaffRequirementScenario) -> i64 {
        self.repo.insert_scenario(&scenario).unwrap()
    }

    pub fn scenario_requirement(
        &self,
        scenario_id: i64,
        position_id: i64,
        preferred: i32,
        minimum: i32,
        override_base: bool,
    ) -> &Self {
        self.repo
            .insert_scenario_requirement(&ScenarioPositionRequirement {
                scenario_id,
                position_id,
                preferred_staff: preferred,
                minimum_staff: minimum,
                override_base,
            })
            .unwrap();
        self
    }
}

/// 空白场景（全部条件缺省）
pub fn blank_scenario(name: &str, priority: i32) -> StaffRequirementScenario {
    StaffRequirementScenario {
        scenario_id: 0,
        name: name.to_string(),
        priority,
        is_active: true,
        day_of_week: None,
        revenue_tier_id: None,
        revenue_min: None,
        revenue_max: None,
        use_day_of_week_revenue: false,
        use_specific_date_revenue: false,
        doctor_count: None,
        min_doctor_count: None,
    }
}
