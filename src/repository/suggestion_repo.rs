// ==========================================
// 轮岗人员调配系统 - 调配建议仓储
// ==========================================
// 职责: 调配建议持久化 + 审批事务
// 红线: 批准与创建轮岗派遣必须在同一事务内完成
// 红线: 仅 PENDING 状态可被审核
// ==========================================

use crate::domain::types::SuggestionStatus;
use crate::domain::{AllocationSuggestion, RotationAssignment, SuggestionAction};
use crate::repository::contracts::SuggestionRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::staffing_repo::{
    bump_revision, format_date, format_datetime, insert_assignment_row, parse_date,
    parse_datetime, SqliteStaffingRepository,
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// 批准建议时创建的派遣级别
const APPROVED_ASSIGNMENT_LEVEL: i32 = 1;

const SUGGESTION_COLUMNS: &str = r#"
    suggestion_id, run_id, staff_id, staff_nickname, branch_id, position_id, suggestion_date,
    confidence, reason, status, created_at, reviewed_by, reviewed_at, review_note
"#;

fn map_suggestion(row: &Row) -> rusqlite::Result<AllocationSuggestion> {
    let reviewed_at: Option<String> = row.get(12)?;
    Ok(AllocationSuggestion {
        suggestion_id: row.get(0)?,
        run_id: row.get(1)?,
        staff_id: row.get(2)?,
        staff_nickname: row.get(3)?,
        branch_id: row.get(4)?,
        position_id: row.get(5)?,
        suggestion_date: parse_date(6, &row.get::<_, String>(6)?)?,
        confidence: row.get(7)?,
        reason: row.get(8)?,
        status: SuggestionStatus::parse(&row.get::<_, String>(9)?),
        created_at: parse_datetime(10, &row.get::<_, String>(10)?)?,
        reviewed_by: row.get(11)?,
        reviewed_at: reviewed_at
            .as_deref()
            .map(|raw| parse_datetime(12, raw))
            .transpose()?,
        review_note: row.get(13)?,
    })
}

fn load_suggestion(
    conn: &Connection,
    suggestion_id: &str,
) -> RepositoryResult<Option<AllocationSuggestion>> {
    let sql = format!(
        "SELECT {} FROM allocation_suggestion WHERE suggestion_id = ?1",
        SUGGESTION_COLUMNS
    );
    let suggestion = conn
        .query_row(&sql, params![suggestion_id], map_suggestion)
        .optional()?;
    Ok(suggestion)
}

/// 读取建议并校验审核动作的状态流转
///
/// # 返回
/// - 建议本身与流转后的状态
/// - 不存在返回 NotFound，非法流转返回 InvalidStateTransition
fn load_for_review(
    conn: &Connection,
    suggestion_id: &str,
    action: SuggestionAction,
) -> RepositoryResult<(AllocationSuggestion, SuggestionStatus)> {
    let suggestion =
        load_suggestion(conn, suggestion_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "AllocationSuggestion".to_string(),
            id: suggestion_id.to_string(),
        })?;

    let next = suggestion
        .status
        .apply(action)
        .ok_or_else(|| RepositoryError::InvalidStateTransition {
            from: suggestion.status.to_string(),
            to: action.target().to_string(),
        })?;
    Ok((suggestion, next))
}

impl SuggestionRepository for SqliteStaffingRepository {
    fn insert_suggestions(&self, suggestions: &[AllocationSuggestion]) -> RepositoryResult<usize> {
        if suggestions.is_empty() {
            return Ok(0);
        }

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO allocation_suggestion (
                    suggestion_id, run_id, staff_id, staff_nickname, branch_id, position_id,
                    suggestion_date, confidence, reason, status, created_at,
                    reviewed_by, reviewed_at, review_note
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
            )?;
            for s in suggestions {
                stmt.execute(params![
                    s.suggestion_id,
                    s.run_id,
                    s.staff_id,
                    s.staff_nickname,
                    s.branch_id,
                    s.position_id,
                    format_date(s.suggestion_date),
                    s.confidence,
                    s.reason,
                    s.status.as_str(),
                    format_datetime(s.created_at),
                    s.reviewed_by,
                    s.reviewed_at.map(format_datetime),
                    s.review_note,
                ])?;
            }
        }
        tx.commit()?;
        Ok(suggestions.len())
    }

    fn find_suggestion(&self, suggestion_id: &str) -> RepositoryResult<Option<AllocationSuggestion>> {
        let conn = self.get_conn()?;
        load_suggestion(&conn, suggestion_id)
    }

    fn list_suggestions_by_status(
        &self,
        status: SuggestionStatus,
    ) -> RepositoryResult<Vec<AllocationSuggestion>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM allocation_suggestion
            WHERE status = ?1
            ORDER BY suggestion_date, branch_id, position_id, suggestion_id
            "#,
            SUGGESTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let suggestions = stmt
            .query_map(params![status.as_str()], map_suggestion)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(suggestions)
    }

    fn approve_suggestion(
        &self,
        suggestion_id: &str,
        reviewer: &str,
        reviewed_at: NaiveDateTime,
    ) -> RepositoryResult<RotationAssignment> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let (suggestion, next) = load_for_review(&tx, suggestion_id, SuggestionAction::Approve)?;

        let updated = tx.execute(
            r#"
            UPDATE allocation_suggestion
               SET status = ?2, reviewed_by = ?3, reviewed_at = ?4
             WHERE suggestion_id = ?1 AND status = ?5
            "#,
            params![
                suggestion_id,
                next.as_str(),
                reviewer,
                format_datetime(reviewed_at),
                suggestion.status.as_str()
            ],
        )?;
        if updated != 1 {
            return Err(RepositoryError::DatabaseTransactionError(format!(
                "建议状态更新失败: suggestion_id={}",
                suggestion_id
            )));
        }

        let assignment = insert_assignment_row(
            &tx,
            suggestion.staff_id,
            suggestion.branch_id,
            suggestion.suggestion_date,
            APPROVED_ASSIGNMENT_LEVEL,
            reviewed_at,
        )?;
        bump_revision(&tx, suggestion.branch_id)?;

        tx.commit()?;
        Ok(assignment)
    }

    fn reject_suggestion(
        &self,
        suggestion_id: &str,
        reviewer: &str,
        note: Option<&str>,
        reviewed_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let (suggestion, next) = load_for_review(&tx, suggestion_id, SuggestionAction::Reject)?;

        tx.execute(
            r#"
            UPDATE allocation_suggestion
               SET status = ?2, reviewed_by = ?3, reviewed_at = ?4, review_note = ?5
             WHERE suggestion_id = ?1 AND status = ?6
            "#,
            params![
                suggestion_id,
                next.as_str(),
                reviewer,
                format_datetime(reviewed_at),
                note,
                suggestion.status.as_str()
            ],
        )?;

        tx.commit()?;
        Ok(())
    }
}
