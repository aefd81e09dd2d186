// ==========================================
// CriteriaEngine 集成测试
// ==========================================
// 覆盖: 三支柱加权评分、营收口径、停用评分项、高活跃判定、批量评分
// ==========================================

mod helpers;

use helpers::{day, Fixture, MockConfig};
use rotation_allocation::domain::types::{CriterionType, Pillar};
use rotation_allocation::domain::AllocationCriterion;
use rotation_allocation::engine::{CriteriaEngine, EngineError, QuotaCalculator};
use rotation_allocation::repository::SqliteStaffingRepository;
use std::sync::Arc;

type Engine = CriteriaEngine<SqliteStaffingRepository, MockConfig>;

fn engine(f: &Fixture, config: MockConfig) -> Engine {
    let quota = Arc::new(QuotaCalculator::new(f.repo.clone()));
    CriteriaEngine::new(f.repo.clone(), Arc::new(config), quota)
}

/// 分院 BR-01:
/// - 星期基准营收 250000, 2 名医生出诊
/// - 护士最低 2 人（1 人在岗）, 前台最低 1 人（无人在岗）
fn scored_fixture() -> Fixture {
    let f = Fixture::in_memory();
    f.branch(1, "BR-01")
        .weekday_revenue(1, day(), 250_000.0)
        .position(1, "护士")
        .position(2, "前台")
        .doctor(100, "王医生")
        .doctor(101, "李医生")
        .doctor_on(100, 1, day(), 0.0)
        .doctor_on(101, 1, day(), 0.0)
        .quota(1, 1, 2, 2)
        .quota(1, 2, 1, 1)
        .branch_staff(10, 1, 1, "小李")
        .working(&[10], day())
        .criterion(CriterionType::Revenue, Pillar::ClinicWide, 1.0)
        .criterion(CriterionType::Bookings, Pillar::ClinicWide, 3.0)
        .criterion(CriterionType::DoctorCount, Pillar::DoctorSpecific, 1.0)
        .criterion(CriterionType::MinimumStaffPerPosition, Pillar::BranchSpecific, 1.0)
        .criterion(CriterionType::MinimumStaffPerBranch, Pillar::BranchSpecific, 1.0);
    f
}

#[tokio::test]
async fn test_three_pillar_weighted_score() {
    let f = scored_fixture();
    let engine = engine(&f, MockConfig::default());

    let score = engine.evaluate_criteria(1, day()).await.unwrap();

    // 全院: (1 × 0.25 + 3 × 0.5) / 4
    assert!((score.clinic_wide_score - 0.4375).abs() < 1e-9);
    // 医生: 2 / 5
    assert!((score.doctor_specific_score - 0.4).abs() < 1e-9);
    // 分院: 两个评分项均为各配额达成率 (0.5 + 0) / 2 的平均
    let branch_expected = 0.25;
    assert!((score.branch_specific_score - branch_expected).abs() < 1e-9);

    let overall = (0.4375 + 0.4 + branch_expected) / 3.0;
    assert!((score.overall_score - overall).abs() < 1e-9);
    assert_eq!(score.criterion_scores.len(), 5);
}

#[tokio::test]
async fn test_doctor_source_branch_scores_doctor_revenue() {
    let f = Fixture::in_memory();
    f.doctor_revenue_branch(1, "BR-01")
        .weekday_revenue(1, day(), 900_000.0)
        .doctor(100, "王医生")
        .doctor(101, "李医生")
        .doctor_on(100, 1, day(), 150_000.0)
        .doctor_on(101, 1, day(), 50_000.0)
        .criterion(CriterionType::Revenue, Pillar::ClinicWide, 1.0);
    let engine = engine(&f, MockConfig::default());

    let score = engine.evaluate_criteria(1, day()).await.unwrap();
    assert!((score.clinic_wide_score - 0.2).abs() < 1e-9);
    assert_eq!(score.doctor_specific_score, 0.0);
    assert_eq!(score.branch_specific_score, 0.0);
}

#[tokio::test]
async fn test_missing_weekday_revenue_scores_zero() {
    let f = Fixture::in_memory();
    f.branch(1, "BR-01")
        .criterion(CriterionType::Revenue, Pillar::ClinicWide, 1.0);
    let engine = engine(&f, MockConfig::default());

    let score = engine.evaluate_criteria(1, day()).await.unwrap();
    assert_eq!(score.clinic_wide_score, 0.0);
    assert_eq!(score.criterion_scores.len(), 1);
}

#[tokio::test]
async fn test_inactive_criterion_ignored() {
    let f = Fixture::in_memory();
    f.branch(1, "BR-01")
        .criterion(CriterionType::Bookings, Pillar::DoctorSpecific, 1.0);
    f.repo
        .insert_criterion(&AllocationCriterion {
            criterion_id: 0,
            name: "停用项".to_string(),
            criterion_type: CriterionType::Bookings,
            pillar: Pillar::ClinicWide,
            weight: 5.0,
            is_active: false,
        })
        .unwrap();
    let engine = engine(&f, MockConfig::default());

    let score = engine.evaluate_criteria(1, day()).await.unwrap();
    assert_eq!(score.criterion_scores.len(), 1);
    assert_eq!(score.clinic_wide_score, 0.0);
    assert!((score.doctor_specific_score - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_high_activity_threshold() {
    let f = Fixture::in_memory();
    f.branch(1, "BR-01")
        .criterion(CriterionType::Bookings, Pillar::ClinicWide, 1.0)
        .criterion(CriterionType::Bookings, Pillar::DoctorSpecific, 1.0)
        .criterion(CriterionType::Bookings, Pillar::BranchSpecific, 1.0);

    let quiet = engine(&f, MockConfig::default());
    assert!(!quiet.is_high_activity(1, day()).await);

    let mut config = MockConfig::default();
    config.high_activity_threshold = 0.5;
    let busy = engine(&f, config);
    assert!(busy.is_high_activity(1, day()).await);

    // 未知分院降级为非高活跃
    assert!(!busy.is_high_activity(404, day()).await);
}

#[tokio::test]
async fn test_unknown_branch_and_range() {
    let f = scored_fixture();
    let engine = engine(&f, MockConfig::default());

    let err = engine.evaluate_criteria(404, day()).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    let end = day() + chrono::Duration::days(2);
    let scores = engine.evaluate_range(&[1], day(), end).await.unwrap();
    assert_eq!(scores.len(), 3);
    assert_eq!(scores[2].score_date, end);

    let err = engine.evaluate_range(&[1], end, day()).await.unwrap_err();
    assert!(matches!(err, EngineError::ValidationError(_)));
}
