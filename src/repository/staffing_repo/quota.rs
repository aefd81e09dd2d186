use super::{bump_all_revisions, bump_revision, SqliteStaffingRepository};
use crate::domain::types::{weekday_from_db, weekday_to_db};
use crate::domain::{
    BranchCategoryConstraint, BranchConstraint, GroupRequirement, Position, PositionQuota,
    StaffGroup,
};
use crate::repository::contracts::QuotaReader;
use crate::repository::error::RepositoryResult;
use chrono::Weekday;
use rusqlite::{params, Connection, OptionalExtension};

/// 侧载约束的员工组要求
fn load_group_requirements(
    conn: &Connection,
    link_table: &str,
    constraint_id: i64,
) -> RepositoryResult<Vec<GroupRequirement>> {
    let sql = format!(
        r#"
        SELECT g.staff_group_id, g.name, l.minimum_count
        FROM {} l
        JOIN staff_group g ON g.staff_group_id = l.staff_group_id
        WHERE l.constraint_id = ?1
        ORDER BY g.staff_group_id
        "#,
        link_table
    );
    let mut stmt = conn.prepare(&sql)?;
    let requirements = stmt
        .query_map(params![constraint_id], |row| {
            Ok(GroupRequirement {
                staff_group_id: row.get(0)?,
                staff_group_name: row.get(1)?,
                minimum_count: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(requirements)
}

impl QuotaReader for SqliteStaffingRepository {
    fn list_positions(&self) -> RepositoryResult<Vec<Position>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT position_id, name, is_branch_bound FROM position ORDER BY position_id",
        )?;
        let positions = stmt
            .query_map([], |row| {
                Ok(Position {
                    position_id: row.get(0)?,
                    name: row.get(1)?,
                    is_branch_bound: row.get::<_, i32>(2)? != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(positions)
    }

    fn find_active_quotas(&self, branch_id: i64) -> RepositoryResult<Vec<PositionQuota>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT quota_id, branch_id, position_id, minimum_required, designated_quota, is_active
            FROM position_quota
            WHERE branch_id = ?1 AND is_active = 1
            ORDER BY position_id
            "#,
        )?;
        let quotas = stmt
            .query_map(params![branch_id], |row| {
                Ok(PositionQuota {
                    quota_id: row.get(0)?,
                    branch_id: row.get(1)?,
                    position_id: row.get(2)?,
                    minimum_required: row.get(3)?,
                    designated_quota: row.get(4)?,
                    is_active: row.get::<_, i32>(5)? != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(quotas)
    }

    fn find_branch_constraint(
        &self,
        branch_id: i64,
        day_of_week: Weekday,
    ) -> RepositoryResult<Option<BranchConstraint>> {
        let conn = self.get_conn()?;
        let header: Option<(i64, i32)> = conn
            .query_row(
                r#"
                SELECT constraint_id, day_of_week
                FROM branch_constraint
                WHERE branch_id = ?1 AND day_of_week = ?2
                "#,
                params![branch_id, weekday_to_db(day_of_week)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((constraint_id, dow)) = header else {
            return Ok(None);
        };
        let requirements = load_group_requirements(&conn, "branch_constraint_group", constraint_id)?;

        Ok(Some(BranchConstraint {
            constraint_id,
            branch_id,
            day_of_week: weekday_from_db(dow).unwrap_or(day_of_week),
            requirements,
        }))
    }

    fn find_category_constraint(
        &self,
        category_id: i64,
        day_of_week: Weekday,
    ) -> RepositoryResult<Option<BranchCategoryConstraint>> {
        let conn = self.get_conn()?;
        let header: Option<(i64, i32)> = conn
            .query_row(
                r#"
                SELECT constraint_id, day_of_week
                FROM branch_category_constraint
                WHERE category_id = ?1 AND day_of_week = ?2
                "#,
                params![category_id, weekday_to_db(day_of_week)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((constraint_id, dow)) = header else {
            return Ok(None);
        };
        let requirements =
            load_group_requirements(&conn, "branch_category_constraint_group", constraint_id)?;

        Ok(Some(BranchCategoryConstraint {
            constraint_id,
            category_id,
            day_of_week: weekday_from_db(dow).unwrap_or(day_of_week),
            requirements,
        }))
    }

    fn find_group_positions(&self, staff_group_id: i64) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT position_id FROM staff_group_position
            WHERE staff_group_id = ?1
            ORDER BY position_id
            "#,
        )?;
        let ids = stmt
            .query_map(params![staff_group_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }
}

// ==========================================
// 管理端写入
// ==========================================
impl SqliteStaffingRepository {
    pub fn insert_position(&self, position: &Position) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO position (position_id, name, is_branch_bound) VALUES (?1, ?2, ?3)",
            params![
                position.position_id,
                position.name,
                if position.is_branch_bound { 1 } else { 0 },
            ],
        )?;
        bump_all_revisions(&conn)?;
        Ok(())
    }

    /// 新增或更新岗位配额（按 branch_id + position_id 唯一）
    pub fn upsert_quota(&self, quota: &PositionQuota) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO position_quota (branch_id, position_id, minimum_required, designated_quota, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(branch_id, position_id) DO UPDATE
               SET minimum_required = ?3, designated_quota = ?4, is_active = ?5
            "#,
            params![
                quota.branch_id,
                quota.position_id,
                quota.minimum_required,
                quota.designated_quota,
                if quota.is_active { 1 } else { 0 },
            ],
        )?;
        bump_revision(&conn, quota.branch_id)?;
        Ok(())
    }

    /// 新增员工组及其岗位映射
    pub fn insert_staff_group(
        &self,
        group: &StaffGroup,
        position_ids: &[i64],
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO staff_group (staff_group_id, name) VALUES (?1, ?2)",
            params![group.staff_group_id, group.name],
        )?;
        for position_id in position_ids {
            tx.execute(
                "INSERT INTO staff_group_position (staff_group_id, position_id) VALUES (?1, ?2)",
                params![group.staff_group_id, position_id],
            )?;
        }
        bump_all_revisions(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// 覆盖写入分院某星期的专属约束
    pub fn upsert_branch_constraint(
        &self,
        branch_id: i64,
        day_of_week: Weekday,
        requirements: &[(i64, i32)],
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO branch_constraint (branch_id, day_of_week) VALUES (?1, ?2)",
            params![branch_id, weekday_to_db(day_of_week)],
        )?;
        let constraint_id: i64 = tx.query_row(
            "SELECT constraint_id FROM branch_constraint WHERE branch_id = ?1 AND day_of_week = ?2",
            params![branch_id, weekday_to_db(day_of_week)],
            |row| row.get(0),
        )?;
        tx.execute(
            "DELETE FROM branch_constraint_group WHERE constraint_id = ?1",
            params![constraint_id],
        )?;
        for (staff_group_id, minimum_count) in requirements {
            tx.execute(
                r#"
                INSERT INTO branch_constraint_group (constraint_id, staff_group_id, minimum_count)
                VALUES (?1, ?2, ?3)
                "#,
                params![constraint_id, staff_group_id, minimum_count],
            )?;
        }
        bump_revision(&tx, branch_id)?;
        tx.commit()?;
        Ok(constraint_id)
    }

    /// 覆盖写入分院类别某星期的默认约束
    pub fn upsert_category_constraint(
        &self,
        category_id: i64,
        day_of_week: Weekday,
        requirements: &[(i64, i32)],
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO branch_category_constraint (category_id, day_of_week) VALUES (?1, ?2)",
            params![category_id, weekday_to_db(day_of_week)],
        )?;
        let constraint_id: i64 = tx.query_row(
            "SELECT constraint_id FROM branch_category_constraint WHERE category_id = ?1 AND day_of_week = ?2",
            params![category_id, weekday_to_db(day_of_week)],
            |row| row.get(0),
        )?;
        tx.execute(
            "DELETE FROM branch_category_constraint_group WHERE constraint_id = ?1",
            params![constraint_id],
        )?;
        for (staff_group_id, minimum_count) in requirements {
            tx.execute(
                r#"
                INSERT INTO branch_category_constraint_group (constraint_id, staff_group_id, minimum_count)
                VALUES (?1, ?2, ?3)
                "#,
                params![constraint_id, staff_group_id, minimum_count],
            )?;
        }
        bump_all_revisions(&tx)?;
        tx.commit()?;
        Ok(constraint_id)
    }
}
