// ==========================================
// QuotaCalculator 集成测试
// ==========================================
// 覆盖: 关闭分院、员工组缺口、岗位缺口/超编、排班裁决、轮岗计数、约束回退、批量计算
// ==========================================

mod helpers;

use helpers::{blank_scenario, day, Fixture};
use rotation_allocation::domain::types::ScheduleStatus;
use rotation_allocation::domain::ConstraintSource;
use rotation_allocation::engine::{EngineError, QuotaCalculator};

/// 基础分院: 1 名医生, 护士岗位 (1), 前台岗位 (2)
fn base_fixture() -> Fixture {
    let f = Fixture::in_memory();
    f.branch(1, "BR-01")
        .position(1, "护士")
        .position(2, "前台")
        .doctor(100, "王医生")
        .doctor_on(100, 1, day(), 30_000.0);
    f
}

#[test]
fn test_zero_doctors_closes_branch() {
    let f = Fixture::in_memory();
    f.branch(1, "BR-01")
        .position(1, "护士")
        .quota(1, 1, 2, 3)
        .branch_staff(10, 1, 1, "小李")
        .schedule(10, day(), ScheduleStatus::Off)
        .group(500, "临床组", &[1])
        .branch_constraint(1, day(), &[(500, 3)]);

    let calc = QuotaCalculator::new(f.repo.clone());
    let status = calc.calculate_branch_quota_status(1, day()).unwrap();

    assert!(!status.is_operational);
    assert_eq!(status.total_designated, 0);
    assert_eq!(status.total_available, 0);
    assert_eq!(status.total_assigned, 0);
    assert_eq!(status.total_required, 0);
    assert_eq!(status.group1_score, 0);
    assert_eq!(status.group2_score, 0);
    assert_eq!(status.group3_score, 0);
    assert!(status.doctors.is_empty());
    assert!(status.group1_missing_staff().is_empty());
    assert!(status.group2_missing_staff().is_empty());
}

#[test]
fn test_group_requires_three_with_one_working() {
    let f = base_fixture();
    f.quota(1, 1, 0, 3)
        .branch_staff(10, 1, 1, "小李")
        .branch_staff(11, 1, 1, "小王")
        .branch_staff(12, 1, 1, "小张")
        .schedule(10, day(), ScheduleStatus::Working)
        .schedule(11, day(), ScheduleStatus::Off)
        .schedule(12, day(), ScheduleStatus::Off)
        .group(500, "临床组", &[1])
        .branch_constraint(1, day(), &[(500, 3)]);

    let calc = QuotaCalculator::new(f.repo.clone());
    let status = calc.calculate_branch_quota_status(1, day()).unwrap();

    assert!(status.is_operational);
    assert_eq!(status.doctors, vec!["王医生".to_string()]);
    assert_eq!(status.constraint_source, ConstraintSource::Branch);
    assert_eq!(status.group1_score, -2);
    assert_eq!(status.group1_details.len(), 1);
    assert_eq!(status.group1_details[0].actual_count, 1);
    assert_eq!(
        status.group1_missing_staff(),
        vec!["小张".to_string(), "小王".to_string()]
    );
}

#[test]
fn test_excess_over_designated_quota() {
    let f = base_fixture();
    f.quota(1, 1, 2, 4);
    for (id, name) in [(10, "甲"), (11, "乙"), (12, "丙"), (13, "丁"), (14, "戊")] {
        f.branch_staff(id, 1, 1, name);
    }
    f.working(&[10, 11, 12, 13, 14], day());

    let calc = QuotaCalculator::new(f.repo.clone());
    let status = calc.calculate_branch_quota_status(1, day()).unwrap();
    let nurse = status.position(1).unwrap();

    assert_eq!(nurse.total_assigned, 5);
    assert_eq!(nurse.minimum_required - nurse.total_assigned, -3);
    assert_eq!(nurse.designated_quota - nurse.total_assigned, -1);
    assert_eq!(nurse.still_required, 0);
    assert_eq!(status.group3_score, 1);
    assert_eq!(status.group3_details[0].excess, 1);
    assert_eq!(status.group2_score, 0);
}

#[test]
fn test_missing_schedule_row_counts_as_absent() {
    let f = base_fixture();
    f.quota(1, 2, 1, 1)
        .branch_staff(20, 1, 2, "前台小周")
        .branch_staff(21, 1, 2, "前台小吴")
        .schedule(21, day(), ScheduleStatus::Working);

    let calc = QuotaCalculator::new(f.repo.clone());
    let status = calc.calculate_branch_quota_status(1, day()).unwrap();

    assert_eq!(status.position(2).unwrap().available_local, 1);
    assert_eq!(status.group2_score, 0);

    f.quota(1, 2, 2, 2);
    let status = calc.calculate_branch_quota_status(1, day()).unwrap();
    assert_eq!(status.group2_score, -1);
    assert_eq!(status.group2_missing_staff(), vec!["前台小周".to_string()]);
}

#[test]
fn test_duplicate_schedule_rows_most_restrictive_wins() {
    let f = base_fixture();
    f.quota(1, 1, 1, 1)
        .branch_staff(10, 1, 1, "小李")
        .schedule(10, day(), ScheduleStatus::Working)
        .schedule(10, day(), ScheduleStatus::SickLeave);

    let calc = QuotaCalculator::new(f.repo.clone());
    let status = calc.calculate_branch_quota_status(1, day()).unwrap();

    // 计数与缺员名单口径一致
    assert_eq!(status.position(1).unwrap().available_local, 0);
    assert_eq!(status.group2_score, -1);
    assert_eq!(status.group2_missing_staff(), vec!["小李".to_string()]);
}

#[test]
fn test_rotation_assignment_fills_quota() {
    let f = base_fixture();
    f.branch(2, "BR-02")
        .quota(1, 1, 2, 2)
        .branch_staff(10, 1, 1, "小李")
        .working(&[10], day())
        .rotation_staff(90, 1, "轮岗小陈", Some(2), &[1, 2])
        .assign(90, 1, day());

    let calc = QuotaCalculator::new(f.repo.clone());
    let status = calc.calculate_branch_quota_status(1, day()).unwrap();
    let nurse = status.position(1).unwrap();

    assert_eq!(nurse.available_local, 1);
    assert_eq!(nurse.assigned_rotation, 1);
    assert_eq!(nurse.total_assigned, 2);
    assert_eq!(status.total_required, 0);
    assert!(status.is_present(90));
}

#[test]
fn test_category_constraint_used_without_branch_constraint() {
    let f = Fixture::in_memory();
    f.category(1, "社区店")
        .branch_in_category(1, "BR-01", 1)
        .position(1, "护士")
        .doctor(100, "王医生")
        .doctor_on(100, 1, day(), 10_000.0)
        .quota(1, 1, 0, 2)
        .branch_staff(10, 1, 1, "小李")
        .working(&[10], day())
        .group(500, "临床组", &[1]);

    use chrono::Datelike;
    f.repo
        .upsert_category_constraint(1, day().weekday(), &[(500, 2)])
        .unwrap();

    let calc = QuotaCalculator::new(f.repo.clone());
    let status = calc.calculate_branch_quota_status(1, day()).unwrap();

    assert_eq!(status.constraint_source, ConstraintSource::Category);
    assert_eq!(status.group1_score, -1);
}

#[test]
fn test_scenario_adjusts_quota_targets() {
    let f = base_fixture();
    f.quota(1, 1, 1, 2)
        .branch_staff(10, 1, 1, "小李")
        .working(&[10], day());

    let mut busy = blank_scenario("多医生", 10);
    busy.min_doctor_count = Some(1);
    let scenario_id = f.scenario(busy);
    f.scenario_requirement(scenario_id, 1, 1, 2, false);

    let plain = QuotaCalculator::new(f.repo.clone());
    let adjusted = QuotaCalculator::new(f.repo.clone()).with_scenarios();

    let base = plain.calculate_branch_quota_status(1, day()).unwrap();
    assert_eq!(base.group2_score, 0);
    assert!(!base.scenarios_applied);

    let status = adjusted.calculate_branch_quota_status(1, day()).unwrap();
    let nurse = status.position(1).unwrap();
    assert!(status.scenarios_applied);
    assert!(nurse.scenario_adjusted);
    assert_eq!(nurse.minimum_required, 3);
    assert_eq!(nurse.designated_quota, 3);
    assert_eq!(status.group2_score, -2);
}

#[test]
fn test_unknown_branch_is_not_found() {
    let f = Fixture::in_memory();
    let calc = QuotaCalculator::new(f.repo.clone());
    let err = calc.calculate_branch_quota_status(404, day()).unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[test]
fn test_calculate_range_covers_branch_by_date() {
    let f = base_fixture();
    f.branch(2, "BR-02").quota(1, 1, 1, 1);
    let calc = QuotaCalculator::new(f.repo.clone());

    let end = day().succ_opt().unwrap();
    let results = calc.calculate_range(&[1, 2], day(), end).unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!((results[0].branch_id, results[0].status_date), (1, day()));
    assert_eq!((results[3].branch_id, results[3].status_date), (2, end));

    let err = calc.calculate_range(&[1], end, day()).unwrap_err();
    assert!(matches!(err, EngineError::ValidationError(_)));

    // 首个错误即中止
    assert!(calc.calculate_range(&[1, 404], day(), end).is_err());
}

#[test]
fn test_group_counts_only_positions_with_quota() {
    let f = base_fixture();
    f.quota(1, 1, 0, 1)
        .branch_staff(10, 1, 1, "小李")
        .branch_staff(20, 1, 2, "前台小周")
        .branch_staff(21, 1, 2, "前台小吴")
        .working(&[10, 20, 21], day())
        .group(500, "门诊组", &[1, 2])
        .branch_constraint(1, day(), &[(500, 3)]);

    let calc = QuotaCalculator::new(f.repo.clone());
    let status = calc.calculate_branch_quota_status(1, day()).unwrap();

    // 前台无配额，在岗 2 人不计入
    assert_eq!(status.group1_details[0].actual_count, 1);
    assert_eq!(status.group1_score, -2);
    assert!(status.position(2).is_none());
}
