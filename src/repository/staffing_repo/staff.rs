use super::{
    bump_revision, format_date, format_datetime, parse_date, parse_datetime, placeholders,
    SqliteStaffingRepository,
};
use crate::domain::types::{ScheduleStatus, StaffType};
use crate::domain::{RotationAssignment, Staff, StaffSchedule};
use crate::repository::contracts::StaffReader;
use crate::repository::error::RepositoryResult;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const STAFF_COLUMNS: &str =
    "s.staff_id, s.staff_type, s.position_id, s.branch_id, s.nickname, s.skill_level, s.is_active";

fn map_staff(row: &Row) -> rusqlite::Result<Staff> {
    Ok(Staff {
        staff_id: row.get(0)?,
        staff_type: StaffType::parse(&row.get::<_, String>(1)?),
        position_id: row.get(2)?,
        branch_id: row.get(3)?,
        nickname: row.get(4)?,
        skill_level: row.get(5)?,
        is_active: row.get::<_, i32>(6)? != 0,
    })
}

fn map_assignment(row: &Row) -> rusqlite::Result<RotationAssignment> {
    Ok(RotationAssignment {
        assignment_id: row.get(0)?,
        staff_id: row.get(1)?,
        branch_id: row.get(2)?,
        assignment_date: parse_date(3, &row.get::<_, String>(3)?)?,
        assignment_level: row.get(4)?,
        created_at: parse_datetime(5, &row.get::<_, String>(5)?)?,
    })
}

/// 写入轮岗派遣（供审批事务复用，调用方负责递增版本号）
pub(crate) fn insert_assignment_row(
    conn: &Connection,
    staff_id: i64,
    branch_id: i64,
    assignment_date: NaiveDate,
    assignment_level: i32,
    created_at: NaiveDateTime,
) -> RepositoryResult<RotationAssignment> {
    conn.execute(
        r#"
        INSERT INTO rotation_assignment (staff_id, branch_id, assignment_date, assignment_level, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            staff_id,
            branch_id,
            format_date(assignment_date),
            assignment_level,
            format_datetime(created_at),
        ],
    )?;
    Ok(RotationAssignment {
        assignment_id: conn.last_insert_rowid(),
        staff_id,
        branch_id,
        assignment_date,
        assignment_level,
        created_at,
    })
}

impl StaffReader for SqliteStaffingRepository {
    fn find_staff(&self, staff_id: i64) -> RepositoryResult<Option<Staff>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM staff s WHERE s.staff_id = ?1", STAFF_COLUMNS);
        let staff = conn.query_row(&sql, params![staff_id], map_staff).optional()?;
        Ok(staff)
    }

    fn find_staff_by_branch(&self, branch_id: i64) -> RepositoryResult<Vec<Staff>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM staff s
            WHERE s.branch_id = ?1 AND s.staff_type = 'BRANCH' AND s.is_active = 1
            ORDER BY s.staff_id
            "#,
            STAFF_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let staff = stmt
            .query_map(params![branch_id], map_staff)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(staff)
    }

    fn find_eligible_rotation_staff(
        &self,
        branch_id: i64,
        position_id: i64,
    ) -> RepositoryResult<Vec<Staff>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM staff s
            JOIN rotation_staff_branch rsb ON rsb.staff_id = s.staff_id
            WHERE rsb.branch_id = ?1
              AND s.position_id = ?2
              AND s.staff_type = 'ROTATION'
              AND s.is_active = 1
            ORDER BY s.staff_id
            "#,
            STAFF_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let staff = stmt
            .query_map(params![branch_id, position_id], map_staff)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(staff)
    }

    fn find_schedules(
        &self,
        staff_ids: &[i64],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<StaffSchedule>> {
        if staff_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT staff_id, schedule_date, status
            FROM staff_schedule
            WHERE schedule_date >= ?1 AND schedule_date <= ?2
              AND staff_id IN ({})
            ORDER BY staff_id, schedule_date, schedule_id
            "#,
            placeholders(3, staff_ids.len())
        );

        let mut values: Vec<Value> = Vec::with_capacity(staff_ids.len() + 2);
        values.push(Value::Text(format_date(start_date)));
        values.push(Value::Text(format_date(end_date)));
        values.extend(staff_ids.iter().map(|id| Value::Integer(*id)));

        let mut stmt = conn.prepare(&sql)?;
        let schedules = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(StaffSchedule {
                    staff_id: row.get(0)?,
                    schedule_date: parse_date(1, &row.get::<_, String>(1)?)?,
                    status: ScheduleStatus::parse(&row.get::<_, String>(2)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(schedules)
    }

    fn find_rotation_assignments_by_branch(
        &self,
        branch_id: i64,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<RotationAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT assignment_id, staff_id, branch_id, assignment_date, assignment_level, created_at
            FROM rotation_assignment
            WHERE branch_id = ?1 AND assignment_date = ?2
            ORDER BY assignment_id
            "#,
        )?;
        let assignments = stmt
            .query_map(params![branch_id, format_date(date)], map_assignment)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assignments)
    }

    fn find_rotation_assignments_by_staff(
        &self,
        staff_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<RotationAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT assignment_id, staff_id, branch_id, assignment_date, assignment_level, created_at
            FROM rotation_assignment
            WHERE staff_id = ?1 AND assignment_date >= ?2 AND assignment_date <= ?3
            ORDER BY assignment_date, assignment_id
            "#,
        )?;
        let assignments = stmt
            .query_map(
                params![staff_id, format_date(start_date), format_date(end_date)],
                map_assignment,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assignments)
    }
}

// ==========================================
// 管理端写入
// ==========================================
impl SqliteStaffingRepository {
    pub fn insert_staff(&self, staff: &Staff) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO staff (staff_id, staff_type, position_id, branch_id, nickname, skill_level, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                staff.staff_id,
                staff.staff_type.as_str(),
                staff.position_id,
                staff.branch_id,
                staff.nickname,
                staff.skill_level,
                if staff.is_active { 1 } else { 0 },
            ],
        )?;
        if let Some(branch_id) = staff.branch_id {
            bump_revision(&conn, branch_id)?;
        }
        Ok(())
    }

    /// 登记轮岗员工可派驻分院
    pub fn add_rotation_branch(&self, staff_id: i64, branch_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO rotation_staff_branch (staff_id, branch_id) VALUES (?1, ?2)",
            params![staff_id, branch_id],
        )?;
        Ok(())
    }

    /// 追加排班记录（同日允许多条，读取侧统一裁决）
    pub fn insert_schedule(&self, schedule: &StaffSchedule) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO staff_schedule (staff_id, schedule_date, status) VALUES (?1, ?2, ?3)",
            params![
                schedule.staff_id,
                format_date(schedule.schedule_date),
                schedule.status.as_str(),
            ],
        )?;
        let home_branch: Option<Option<i64>> = conn
            .query_row(
                "SELECT branch_id FROM staff WHERE staff_id = ?1",
                params![schedule.staff_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(Some(branch_id)) = home_branch {
            bump_revision(&conn, branch_id)?;
        }
        Ok(())
    }

    /// 覆盖员工某日排班（先删后写）
    pub fn replace_schedule(&self, schedule: &StaffSchedule) -> RepositoryResult<()> {
        {
            let conn = self.get_conn()?;
            conn.execute(
                "DELETE FROM staff_schedule WHERE staff_id = ?1 AND schedule_date = ?2",
                params![schedule.staff_id, format_date(schedule.schedule_date)],
            )?;
        }
        self.insert_schedule(schedule)
    }

    pub fn insert_rotation_assignment(
        &self,
        staff_id: i64,
        branch_id: i64,
        assignment_date: NaiveDate,
        assignment_level: i32,
        created_at: NaiveDateTime,
    ) -> RepositoryResult<RotationAssignment> {
        let conn = self.get_conn()?;
        let assignment = insert_assignment_row(
            &conn,
            staff_id,
            branch_id,
            assignment_date,
            assignment_level,
            created_at,
        )?;
        bump_revision(&conn, branch_id)?;
        Ok(assignment)
    }
}
