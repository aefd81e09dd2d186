// ==========================================
// 轮岗人员调配系统 - 分院当日汇总缓存
// ==========================================
// 职责: 以 JSON 快照保存完整的 BranchQuotaStatus
// 红线: 只缓存完整结果; 存储版本号与当前版本号不一致即视为未命中
// ==========================================

use crate::domain::BranchQuotaStatus;
use crate::repository::contracts::SummaryCache;
use crate::repository::error::RepositoryResult;
use crate::repository::staffing_repo::{format_date, format_datetime, SqliteStaffingRepository};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

impl SummaryCache for SqliteStaffingRepository {
    fn load_summary(
        &self,
        branch_id: i64,
        date: NaiveDate,
        revision: i64,
    ) -> RepositoryResult<Option<BranchQuotaStatus>> {
        let conn = self.get_conn()?;
        let row: Option<(i64, String)> = conn
            .query_row(
                r#"
                SELECT revision, payload_json
                FROM branch_daily_summary
                WHERE branch_id = ?1 AND summary_date = ?2
                "#,
                params![branch_id, format_date(date)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((stored_revision, payload)) if stored_revision == revision => {
                let status: BranchQuotaStatus = serde_json::from_str(&payload)?;
                Ok(Some(status))
            }
            _ => Ok(None),
        }
    }

    fn store_summary(&self, status: &BranchQuotaStatus) -> RepositoryResult<()> {
        let payload = serde_json::to_string(status)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO branch_daily_summary (branch_id, summary_date, revision, payload_json, refreshed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(branch_id, summary_date) DO UPDATE
               SET revision = excluded.revision,
                   payload_json = excluded.payload_json,
                   refreshed_at = excluded.refreshed_at
             WHERE excluded.revision >= branch_daily_summary.revision
            "#,
            params![
                status.branch_id,
                format_date(status.status_date),
                status.data_revision,
                payload,
                format_datetime(status.computed_at),
            ],
        )?;
        Ok(())
    }
}
