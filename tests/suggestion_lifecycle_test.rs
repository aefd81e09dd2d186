// ==========================================
// SuggestionEngine 集成测试
// ==========================================
// 覆盖: 候选筛选、同次运行不重复建议、置信度、批准建派遣、驳回、非法流转
// ==========================================

mod helpers;

use helpers::{day, Fixture, MockConfig};
use rotation_allocation::domain::types::{CriterionType, Pillar, SuggestionStatus};
use rotation_allocation::engine::{CriteriaEngine, EngineError, QuotaCalculator, SuggestionEngine};
use rotation_allocation::repository::{SqliteStaffingRepository, StaffReader, SuggestionRepository};
use std::sync::Arc;

type Engine = SuggestionEngine<SqliteStaffingRepository, MockConfig>;

fn engine(f: &Fixture) -> Engine {
    let config = Arc::new(MockConfig::default());
    let quota = Arc::new(QuotaCalculator::new(f.repo.clone()));
    let criteria = Arc::new(CriteriaEngine::new(
        f.repo.clone(),
        config.clone(),
        quota.clone(),
    ));
    SuggestionEngine::new(f.repo.clone(), config, quota, criteria)
}

/// 两个分院均缺护士:
/// - BR-01 缺 2 人, BR-02 缺 1 人
/// - 轮岗护士 90 / 91 均可派驻两院, 92 只能去 BR-02, 93 当日已派驻他院
fn fixture() -> Fixture {
    let f = Fixture::in_memory();
    f.position(1, "护士")
        .position(2, "前台")
        .doctor(100, "王医生")
        .doctor(101, "李医生")
        .branch(1, "BR-01")
        .branch(2, "BR-02")
        .branch(3, "BR-03")
        .doctor_on(100, 1, day(), 0.0)
        .doctor_on(101, 2, day(), 0.0)
        .quota(1, 1, 2, 2)
        .quota(2, 1, 1, 1)
        .rotation_staff(90, 1, "轮岗A", Some(2), &[1, 2])
        .rotation_staff(91, 1, "轮岗B", None, &[1, 2])
        .rotation_staff(92, 1, "轮岗C", Some(1), &[2])
        .rotation_staff(93, 1, "轮岗D", Some(5), &[1, 2, 3])
        .rotation_staff(94, 2, "前台轮岗", None, &[1, 2])
        .assign(93, 3, day())
        .criterion(CriterionType::Bookings, Pillar::ClinicWide, 1.0)
        .criterion(CriterionType::Bookings, Pillar::DoctorSpecific, 1.0)
        .criterion(CriterionType::Bookings, Pillar::BranchSpecific, 1.0);
    f
}

#[tokio::test]
async fn test_generate_fills_shortages_without_double_booking() {
    let f = fixture();
    let engine = engine(&f);

    let suggestions = engine.generate_suggestions(&[1, 2], day(), day()).await.unwrap();

    let picks: Vec<(i64, i64)> = suggestions.iter().map(|s| (s.branch_id, s.staff_id)).collect();
    // BR-01 取 90, 91; BR-02 只剩 92（93 当日已派驻）
    assert_eq!(picks, vec![(1, 90), (1, 91), (2, 92)]);

    let run_id = &suggestions[0].run_id;
    assert!(suggestions.iter().all(|s| &s.run_id == run_id));
    assert!(suggestions.iter().all(|s| s.status == SuggestionStatus::Pending));
    assert!(suggestions.iter().all(|s| s.position_id == 1));

    // 综合评分 0.5 + 技能加成
    assert!((suggestions[0].confidence - 0.6).abs() < 1e-9);
    assert!((suggestions[1].confidence - 0.5).abs() < 1e-9);
    assert!((suggestions[2].confidence - 0.55).abs() < 1e-9);

    let pending = engine.list_suggestions(SuggestionStatus::Pending).unwrap();
    assert_eq!(pending.len(), 3);
}

#[tokio::test]
async fn test_closed_and_satisfied_branches_produce_nothing() {
    let f = fixture();
    let engine = engine(&f);

    // BR-03 无医生出诊
    let suggestions = engine.generate_suggestions(&[3], day(), day()).await.unwrap();
    assert!(suggestions.is_empty());

    let err = engine
        .generate_suggestions(&[1], day().succ_opt().unwrap(), day())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ValidationError(_)));
}

#[tokio::test]
async fn test_approve_creates_assignment_and_is_final() {
    let f = fixture();
    let engine = engine(&f);
    let suggestions = engine.generate_suggestions(&[2], day(), day()).await.unwrap();
    let target = &suggestions[0];

    let assignment = engine
        .approve_suggestion(&target.suggestion_id, "张主管")
        .unwrap();
    assert_eq!(assignment.staff_id, target.staff_id);
    assert_eq!(assignment.branch_id, 2);
    assert_eq!(assignment.assignment_date, day());

    let stored = f.repo.find_suggestion(&target.suggestion_id).unwrap().unwrap();
    assert_eq!(stored.status, SuggestionStatus::Approved);
    assert_eq!(stored.reviewed_by.as_deref(), Some("张主管"));
    assert!(stored.reviewed_at.is_some());

    let assignments = f
        .repo
        .find_rotation_assignments_by_branch(2, day())
        .unwrap();
    assert_eq!(assignments.len(), 1);

    let err = engine
        .reject_suggestion(&target.suggestion_id, "张主管", None)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidStateTransition { ref from, ref to } if from == "APPROVED" && to == "REJECTED"
    ));

    let err = engine
        .approve_suggestion(&target.suggestion_id, "张主管")
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidStateTransition { .. }));
}

#[tokio::test]
async fn test_approved_staff_no_longer_short_or_eligible() {
    let f = fixture();
    let engine = engine(&f);
    let first = engine.generate_suggestions(&[2], day(), day()).await.unwrap();
    engine
        .approve_suggestion(&first[0].suggestion_id, "张主管")
        .unwrap();

    // BR-02 缺口已补齐
    let again = engine.generate_suggestions(&[2], day(), day()).await.unwrap();
    assert!(again.is_empty());

    // 已派驻员工不再作为 BR-01 候选
    let for_other = engine.generate_suggestions(&[1], day(), day()).await.unwrap();
    assert!(for_other.iter().all(|s| s.staff_id != first[0].staff_id));
}

#[tokio::test]
async fn test_reject_records_note() {
    let f = fixture();
    let engine = engine(&f);
    let suggestions = engine.generate_suggestions(&[1], day(), day()).await.unwrap();
    let id = &suggestions[0].suggestion_id;

    engine.reject_suggestion(id, "李经理", Some("技能不匹配")).unwrap();

    let stored = f.repo.find_suggestion(id).unwrap().unwrap();
    assert_eq!(stored.status, SuggestionStatus::Rejected);
    assert_eq!(stored.review_note.as_deref(), Some("技能不匹配"));
    assert!(f.repo.find_rotation_assignments_by_branch(1, day()).unwrap().is_empty());

    let err = engine.approve_suggestion(id, "李经理").unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidStateTransition { ref from, ref to } if from == "REJECTED" && to == "APPROVED"
    ));
    let stored = f.repo.find_suggestion(id).unwrap().unwrap();
    assert_eq!(stored.status, SuggestionStatus::Rejected);
}

#[tokio::test]
async fn test_unknown_suggestion_and_blank_reviewer() {
    let f = fixture();
    let engine = engine(&f);

    let err = engine.approve_suggestion("no-such-id", "张主管").unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    let err = engine.reject_suggestion("no-such-id", " ", None).unwrap_err();
    assert!(matches!(err, EngineError::ValidationError(_)));
}
