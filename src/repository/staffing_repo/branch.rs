use super::{
    bump_all_revisions, bump_revision, format_date, parse_date, SqliteStaffingRepository,
};
use crate::domain::types::{weekday_from_db, weekday_to_db, RevenueSource};
use crate::domain::{Branch, BranchCategory, BranchDailyRevenue, BranchRevenue, RevenueTier};
use crate::repository::contracts::BranchReader;
use crate::repository::error::RepositoryResult;
use chrono::{NaiveDate, Weekday};
use rusqlite::{params, OptionalExtension, Row};

fn map_branch(row: &Row) -> rusqlite::Result<Branch> {
    Ok(Branch {
        branch_id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        category_id: row.get(3)?,
        revenue_source: RevenueSource::parse(&row.get::<_, String>(4)?),
        is_active: row.get::<_, i32>(5)? != 0,
    })
}

impl BranchReader for SqliteStaffingRepository {
    fn find_branch(&self, branch_id: i64) -> RepositoryResult<Option<Branch>> {
        let conn = self.get_conn()?;
        let branch = conn
            .query_row(
                r#"
                SELECT branch_id, code, name, category_id, revenue_source, is_active
                FROM branch
                WHERE branch_id = ?1
                "#,
                params![branch_id],
                map_branch,
            )
            .optional()?;
        Ok(branch)
    }

    fn list_branches(&self) -> RepositoryResult<Vec<Branch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT branch_id, code, name, category_id, revenue_source, is_active
            FROM branch
            WHERE is_active = 1
            ORDER BY code
            "#,
        )?;
        let branches = stmt
            .query_map([], map_branch)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(branches)
    }

    fn current_revision(&self, branch_id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let revision: Option<i64> = conn
            .query_row(
                "SELECT revision FROM branch_data_revision WHERE branch_id = ?1",
                params![branch_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(revision.unwrap_or(0))
    }

    fn find_branch_revenue(
        &self,
        branch_id: i64,
        day_of_week: Weekday,
    ) -> RepositoryResult<Option<BranchRevenue>> {
        let conn = self.get_conn()?;
        let revenue = conn
            .query_row(
                r#"
                SELECT branch_id, day_of_week, expected_revenue
                FROM branch_revenue
                WHERE branch_id = ?1 AND day_of_week = ?2
                "#,
                params![branch_id, weekday_to_db(day_of_week)],
                |row| {
                    Ok(BranchRevenue {
                        branch_id: row.get(0)?,
                        day_of_week: weekday_from_db(row.get(1)?).unwrap_or(day_of_week),
                        expected_revenue: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(revenue)
    }

    fn find_branch_daily_revenue(
        &self,
        branch_id: i64,
        date: NaiveDate,
    ) -> RepositoryResult<Option<BranchDailyRevenue>> {
        let conn = self.get_conn()?;
        let revenue = conn
            .query_row(
                r#"
                SELECT branch_id, revenue_date, expected_revenue, actual_revenue
                FROM branch_daily_revenue
                WHERE branch_id = ?1 AND revenue_date = ?2
                "#,
                params![branch_id, format_date(date)],
                |row| {
                    Ok(BranchDailyRevenue {
                        branch_id: row.get(0)?,
                        revenue_date: parse_date(1, &row.get::<_, String>(1)?)?,
                        expected_revenue: row.get(2)?,
                        actual_revenue: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(revenue)
    }

    fn find_revenue_tier(&self, tier_id: i64) -> RepositoryResult<Option<RevenueTier>> {
        let conn = self.get_conn()?;
        let tier = conn
            .query_row(
                "SELECT tier_id, name, min_revenue, max_revenue FROM revenue_tier WHERE tier_id = ?1",
                params![tier_id],
                |row| {
                    Ok(RevenueTier {
                        tier_id: row.get(0)?,
                        name: row.get(1)?,
                        min_revenue: row.get(2)?,
                        max_revenue: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(tier)
    }
}

// ==========================================
// 管理端写入
// ==========================================
impl SqliteStaffingRepository {
    pub fn insert_category(&self, category: &BranchCategory) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO branch_category (category_id, name) VALUES (?1, ?2)",
            params![category.category_id, category.name],
        )?;
        Ok(())
    }

    /// 新增分院（同时初始化数据版本号）
    pub fn insert_branch(&self, branch: &Branch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO branch (branch_id, code, name, category_id, revenue_source, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                branch.branch_id,
                branch.code,
                branch.name,
                branch.category_id,
                branch.revenue_source.as_str(),
                if branch.is_active { 1 } else { 0 },
            ],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO branch_data_revision (branch_id, revision) VALUES (?1, 0)",
            params![branch.branch_id],
        )?;
        Ok(())
    }

    pub fn upsert_branch_revenue(&self, revenue: &BranchRevenue) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO branch_revenue (branch_id, day_of_week, expected_revenue)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(branch_id, day_of_week) DO UPDATE SET expected_revenue = ?3
            "#,
            params![
                revenue.branch_id,
                weekday_to_db(revenue.day_of_week),
                revenue.expected_revenue,
            ],
        )?;
        bump_revision(&conn, revenue.branch_id)?;
        Ok(())
    }

    pub fn upsert_branch_daily_revenue(&self, revenue: &BranchDailyRevenue) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO branch_daily_revenue (branch_id, revenue_date, expected_revenue, actual_revenue)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(branch_id, revenue_date) DO UPDATE
               SET expected_revenue = ?3, actual_revenue = ?4
            "#,
            params![
                revenue.branch_id,
                format_date(revenue.revenue_date),
                revenue.expected_revenue,
                revenue.actual_revenue,
            ],
        )?;
        bump_revision(&conn, revenue.branch_id)?;
        Ok(())
    }

    pub fn insert_revenue_tier(&self, tier: &RevenueTier) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO revenue_tier (tier_id, name, min_revenue, max_revenue) VALUES (?1, ?2, ?3, ?4)",
            params![tier.tier_id, tier.name, tier.min_revenue, tier.max_revenue],
        )?;
        bump_all_revisions(&conn)?;
        Ok(())
    }
}
