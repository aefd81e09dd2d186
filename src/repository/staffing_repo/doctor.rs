use super::{bump_revision, format_date, parse_date, placeholders, SqliteStaffingRepository};
use crate::domain::{DoctorAssignment, DoctorPreference, PreferenceRequirement};
use crate::repository::contracts::DoctorReader;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter};

impl DoctorReader for SqliteStaffingRepository {
    fn count_doctors(&self, branch_id: i64, date: NaiveDate) -> RepositoryResult<i32> {
        let conn = self.get_conn()?;
        let count: i32 = conn.query_row(
            r#"
            SELECT COUNT(DISTINCT doctor_id)
            FROM doctor_assignment
            WHERE branch_id = ?1 AND assignment_date = ?2
            "#,
            params![branch_id, format_date(date)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn find_doctor_assignments(
        &self,
        branch_id: i64,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<DoctorAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT da.doctor_id, d.name, da.branch_id, da.assignment_date, da.expected_revenue
            FROM doctor_assignment da
            JOIN doctor d ON d.doctor_id = da.doctor_id
            WHERE da.branch_id = ?1 AND da.assignment_date = ?2
            ORDER BY da.doctor_id
            "#,
        )?;
        let assignments = stmt
            .query_map(params![branch_id, format_date(date)], |row| {
                Ok(DoctorAssignment {
                    doctor_id: row.get(0)?,
                    doctor_name: row.get(1)?,
                    branch_id: row.get(2)?,
                    assignment_date: parse_date(3, &row.get::<_, String>(3)?)?,
                    expected_revenue: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assignments)
    }

    fn find_doctor_preferences(&self, doctor_ids: &[i64]) -> RepositoryResult<Vec<DoctorPreference>> {
        if doctor_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT preference_id, doctor_id, requirement_json, is_active
            FROM doctor_preference
            WHERE is_active = 1 AND doctor_id IN ({})
            ORDER BY doctor_id, preference_id
            "#,
            placeholders(1, doctor_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(doctor_ids.iter()), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)? != 0,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(preference_id, doctor_id, json, is_active)| {
                let requirement: PreferenceRequirement = serde_json::from_str(&json)?;
                Ok(DoctorPreference {
                    preference_id,
                    doctor_id,
                    requirement,
                    is_active,
                })
            })
            .collect()
    }
}

// ==========================================
// 管理端写入
// ==========================================
impl SqliteStaffingRepository {
    pub fn insert_doctor(&self, doctor_id: i64, name: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO doctor (doctor_id, name) VALUES (?1, ?2)",
            params![doctor_id, name],
        )?;
        Ok(())
    }

    /// 登记医生出诊（决定分院当日是否营业）
    pub fn insert_doctor_assignment(
        &self,
        doctor_id: i64,
        branch_id: i64,
        assignment_date: NaiveDate,
        expected_revenue: f64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO doctor_assignment (doctor_id, branch_id, assignment_date, expected_revenue)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![doctor_id, branch_id, format_date(assignment_date), expected_revenue],
        )?;
        bump_revision(&conn, branch_id)?;
        Ok(())
    }

    /// 写入医生偏好（写入前校验需求结构）
    pub fn insert_doctor_preference(
        &self,
        doctor_id: i64,
        requirement: &PreferenceRequirement,
    ) -> RepositoryResult<i64> {
        requirement
            .validate()
            .map_err(RepositoryError::ValidationError)?;
        let json = serde_json::to_string(requirement)?;

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO doctor_preference (doctor_id, requirement_json, is_active) VALUES (?1, ?2, 1)",
            params![doctor_id, json],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
