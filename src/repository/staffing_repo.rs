// ==========================================
// 轮岗人员调配系统 - 人员配置数据仓储 (SQLite)
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 实现 contracts 中的只读契约 + 管理端写入
// 约束: 所有查询使用参数化; 影响分院人员事实的写入必须递增数据版本号
// ==========================================

mod branch;
mod doctor;
mod quota;
mod rule;
mod staff;

pub(crate) use staff::insert_assignment_row;

use crate::db::{configure_sqlite_connection, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub(crate) const DATE_FMT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// SqliteStaffingRepository - 人员配置仓储
// ==========================================
pub struct SqliteStaffingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStaffingRepository {
    /// 创建新的仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 获取数据库连接
    pub(crate) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 初始化 schema（幂等）
    pub fn ensure_schema(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        crate::db::init_schema(&conn)?;
        Ok(())
    }
}

// ==========================================
// 数据版本号
// ==========================================

/// 递增单个分院的数据版本号
pub(crate) fn bump_revision(conn: &Connection, branch_id: i64) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO branch_data_revision (branch_id, revision) VALUES (?1, 1)
        ON CONFLICT(branch_id) DO UPDATE SET revision = revision + 1
        "#,
        params![branch_id],
    )?;
    Ok(())
}

/// 递增全部分院的数据版本号（类别约束、员工组、评分项等全局配置变更）
pub(crate) fn bump_all_revisions(conn: &Connection) -> RepositoryResult<()> {
    conn.execute(
        "UPDATE branch_data_revision SET revision = revision + 1",
        [],
    )?;
    Ok(())
}

// ==========================================
// 行映射辅助
// ==========================================

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

pub(crate) fn format_datetime(ts: NaiveDateTime) -> String {
    ts.format(DATETIME_FMT).to_string()
}

pub(crate) fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_datetime(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// 生成 `?1, ?2, ...` 占位符（批量 IN 查询）
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
