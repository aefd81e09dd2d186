// ==========================================
// ScenarioCalculator 集成测试
// ==========================================
// 覆盖: 优先级、无命中原样返回、星期基准营收档位、指定日期营收、医生口径营收
// ==========================================

mod helpers;

use helpers::{blank_scenario, day, Fixture};
use rotation_allocation::engine::ScenarioCalculator;

fn base_fixture() -> Fixture {
    let f = Fixture::in_memory();
    f.branch(1, "BR-01")
        .position(1, "护士")
        .doctor(100, "王医生")
        .doctor(101, "李医生")
        .doctor_on(100, 1, day(), 40_000.0);
    f
}

#[test]
fn test_only_highest_priority_match_applies() {
    let f = base_fixture();
    for (name, priority, preferred) in [("低", 1, 9), ("高", 10, 6), ("中", 5, 7)] {
        let id = f.scenario(blank_scenario(name, priority));
        f.scenario_requirement(id, 1, preferred, 1, true);
    }

    let calc = ScenarioCalculator::new(f.repo.clone());
    let req = calc.calculate_staff_requirements(1, day(), 1, 3, 2).unwrap();

    assert_eq!(req.calculated_preferred, 6);
    assert_eq!(req.calculated_minimum, 1);
    assert_eq!(req.matched_scenario_name.as_deref(), Some("高"));
    assert!(req.match_reasons[0].starts_with("SCENARIO: 高"));
    assert!(req.is_adjusted());
}

#[test]
fn test_no_match_returns_base_exactly() {
    let f = base_fixture();
    let mut weekend = blank_scenario("周末", 10);
    weekend.day_of_week = Some(chrono::Weekday::Sat);
    let id = f.scenario(weekend);
    f.scenario_requirement(id, 1, 8, 8, true);

    let mut crowded = blank_scenario("多医生", 5);
    crowded.min_doctor_count = Some(3);
    let id = f.scenario(crowded);
    f.scenario_requirement(id, 1, 1, 1, false);

    let calc = ScenarioCalculator::new(f.repo.clone());
    let req = calc.calculate_staff_requirements(1, day(), 1, 3, 2).unwrap();

    assert_eq!((req.calculated_preferred, req.calculated_minimum), (3, 2));
    assert!(req.matched_scenario_id.is_none());
    assert!(req.match_reasons.is_empty());
    assert!(!req.is_adjusted());
}

#[test]
fn test_baseline_band_ignores_actual_revenue() {
    let f = base_fixture();
    f.weekday_revenue(1, day(), 75_000.0)
        .daily_revenue(1, day(), 200_000.0, Some(250_000.0))
        .revenue_tier(1, 50_000.0, Some(100_000.0));

    let mut mid = blank_scenario("中档", 10);
    mid.revenue_tier_id = Some(1);
    mid.use_day_of_week_revenue = true;
    let id = f.scenario(mid);
    f.scenario_requirement(id, 1, 1, 1, false);

    let calc = ScenarioCalculator::new(f.repo.clone());
    let req = calc.calculate_staff_requirements(1, day(), 1, 3, 2).unwrap();

    assert_eq!((req.calculated_preferred, req.calculated_minimum), (4, 3));
    assert!(req
        .match_reasons
        .iter()
        .any(|r| r.starts_with("REVENUE_TIER") && r.contains("75000.00")));
}

#[test]
fn test_specific_date_revenue_used_when_flagged() {
    let f = base_fixture();
    f.weekday_revenue(1, day(), 75_000.0)
        .daily_revenue(1, day(), 120_000.0, None);

    let mut high = blank_scenario("高营收日", 10);
    high.revenue_min = Some(100_000.0);
    high.use_specific_date_revenue = true;
    let id = f.scenario(high);
    f.scenario_requirement(id, 1, 5, 4, true);

    let calc = ScenarioCalculator::new(f.repo.clone());
    let req = calc.calculate_staff_requirements(1, day(), 1, 3, 2).unwrap();
    assert_eq!((req.calculated_preferred, req.calculated_minimum), (5, 4));

    // 下周同日无日营收 → 回退星期基准营收 → 不命中
    let next_week = day() + chrono::Duration::days(7);
    let req = calc.calculate_staff_requirements(1, next_week, 1, 3, 2).unwrap();
    assert!(req.matched_scenario_id.is_none());
}

#[test]
fn test_doctor_source_branch_sums_doctor_revenue() {
    let f = Fixture::in_memory();
    f.doctor_revenue_branch(1, "BR-01")
        .position(1, "护士")
        .doctor(100, "王医生")
        .doctor(101, "李医生")
        .doctor_on(100, 1, day(), 40_000.0)
        .doctor_on(101, 1, day(), 30_000.0);

    let calc = ScenarioCalculator::new(f.repo.clone());
    let ctx = calc.load_context(1, day()).unwrap();
    assert_eq!(ctx.specific_date_revenue, Some(70_000.0));
    assert_eq!(ctx.doctor_count, 2);
    assert_eq!(ctx.baseline_revenue, 0.0);
}

#[test]
fn test_first_match_without_position_row_keeps_base() {
    let f = base_fixture();
    f.position(2, "前台");
    let high = f.scenario(blank_scenario("只调前台", 10));
    f.scenario_requirement(high, 2, 5, 5, true);
    let low = f.scenario(blank_scenario("护士加一", 5));
    f.scenario_requirement(low, 1, 1, 1, false);

    let calc = ScenarioCalculator::new(f.repo.clone());
    let req = calc.calculate_staff_requirements(1, day(), 1, 3, 2).unwrap();
    assert_eq!(req.matched_scenario_name.as_deref(), Some("只调前台"));
    assert_eq!((req.calculated_preferred, req.calculated_minimum), (3, 2));
    assert!(!req.is_adjusted());

    let front_desk = calc.calculate_staff_requirements(1, day(), 2, 1, 1).unwrap();
    assert_eq!((front_desk.calculated_preferred, front_desk.calculated_minimum), (5, 5));
}

#[test]
fn test_matching_scenario_without_rows_blocks_lower_priority() {
    let f = base_fixture();
    f.scenario(blank_scenario("空场景", 10));
    let low = f.scenario(blank_scenario("护士加一", 1));
    f.scenario_requirement(low, 1, 1, 1, false);

    let calc = ScenarioCalculator::new(f.repo.clone());
    let req = calc.calculate_staff_requirements(1, day(), 1, 3, 2).unwrap();
    assert_eq!(req.matched_scenario_name.as_deref(), Some("空场景"));
    assert_eq!((req.calculated_preferred, req.calculated_minimum), (3, 2));
}
