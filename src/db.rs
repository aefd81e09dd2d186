// ==========================================
// 轮岗人员调配系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表脚本幂等，便于测试与首次启动
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库（测试用）并建表
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    if let Some(v) = read_schema_version(conn)? {
        if v != CURRENT_SCHEMA_VERSION {
            tracing::warn!(
                expected = CURRENT_SCHEMA_VERSION,
                actual = v,
                "数据库 schema_version 与代码不一致"
            );
        }
    }
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ===== 配置 =====
CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

-- ===== 分院 =====
CREATE TABLE IF NOT EXISTS branch_category (
    category_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS branch (
    branch_id INTEGER PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    category_id INTEGER REFERENCES branch_category(category_id),
    revenue_source TEXT NOT NULL DEFAULT 'BRANCH' CHECK(revenue_source IN ('DOCTOR', 'BRANCH')),
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS branch_data_revision (
    branch_id INTEGER PRIMARY KEY REFERENCES branch(branch_id) ON DELETE CASCADE,
    revision INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS branch_revenue (
    branch_id INTEGER NOT NULL REFERENCES branch(branch_id) ON DELETE CASCADE,
    day_of_week INTEGER NOT NULL CHECK(day_of_week BETWEEN 1 AND 7),
    expected_revenue REAL NOT NULL,
    PRIMARY KEY (branch_id, day_of_week)
);

CREATE TABLE IF NOT EXISTS branch_daily_revenue (
    branch_id INTEGER NOT NULL REFERENCES branch(branch_id) ON DELETE CASCADE,
    revenue_date TEXT NOT NULL,
    expected_revenue REAL NOT NULL,
    actual_revenue REAL,
    PRIMARY KEY (branch_id, revenue_date)
);

CREATE TABLE IF NOT EXISTS revenue_tier (
    tier_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    min_revenue REAL NOT NULL,
    max_revenue REAL
);

-- ===== 岗位与配额 =====
CREATE TABLE IF NOT EXISTS position (
    position_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    is_branch_bound INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS position_quota (
    quota_id INTEGER PRIMARY KEY AUTOINCREMENT,
    branch_id INTEGER NOT NULL REFERENCES branch(branch_id) ON DELETE CASCADE,
    position_id INTEGER NOT NULL REFERENCES position(position_id),
    minimum_required INTEGER NOT NULL DEFAULT 0,
    designated_quota INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    UNIQUE (branch_id, position_id)
);

-- ===== 员工组与约束 =====
CREATE TABLE IF NOT EXISTS staff_group (
    staff_group_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS staff_group_position (
    staff_group_id INTEGER NOT NULL REFERENCES staff_group(staff_group_id) ON DELETE CASCADE,
    position_id INTEGER NOT NULL REFERENCES position(position_id),
    PRIMARY KEY (staff_group_id, position_id)
);

CREATE TABLE IF NOT EXISTS branch_constraint (
    constraint_id INTEGER PRIMARY KEY AUTOINCREMENT,
    branch_id INTEGER NOT NULL REFERENCES branch(branch_id) ON DELETE CASCADE,
    day_of_week INTEGER NOT NULL CHECK(day_of_week BETWEEN 1 AND 7),
    UNIQUE (branch_id, day_of_week)
);

CREATE TABLE IF NOT EXISTS branch_constraint_group (
    constraint_id INTEGER NOT NULL REFERENCES branch_constraint(constraint_id) ON DELETE CASCADE,
    staff_group_id INTEGER NOT NULL REFERENCES staff_group(staff_group_id),
    minimum_count INTEGER NOT NULL,
    PRIMARY KEY (constraint_id, staff_group_id)
);

CREATE TABLE IF NOT EXISTS branch_category_constraint (
    constraint_id INTEGER PRIMARY KEY AUTOINCREMENT,
    category_id INTEGER NOT NULL REFERENCES branch_category(category_id) ON DELETE CASCADE,
    day_of_week INTEGER NOT NULL CHECK(day_of_week BETWEEN 1 AND 7),
    UNIQUE (category_id, day_of_week)
);

CREATE TABLE IF NOT EXISTS branch_category_constraint_group (
    constraint_id INTEGER NOT NULL REFERENCES branch_category_constraint(constraint_id) ON DELETE CASCADE,
    staff_group_id INTEGER NOT NULL REFERENCES staff_group(staff_group_id),
    minimum_count INTEGER NOT NULL,
    PRIMARY KEY (constraint_id, staff_group_id)
);

-- ===== 员工、排班、轮岗 =====
CREATE TABLE IF NOT EXISTS staff (
    staff_id INTEGER PRIMARY KEY,
    staff_type TEXT NOT NULL CHECK(staff_type IN ('BRANCH', 'ROTATION')),
    position_id INTEGER NOT NULL REFERENCES position(position_id),
    branch_id INTEGER REFERENCES branch(branch_id),
    nickname TEXT NOT NULL,
    skill_level INTEGER,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_staff_branch ON staff(branch_id, staff_type);

CREATE TABLE IF NOT EXISTS rotation_staff_branch (
    staff_id INTEGER NOT NULL REFERENCES staff(staff_id) ON DELETE CASCADE,
    branch_id INTEGER NOT NULL REFERENCES branch(branch_id) ON DELETE CASCADE,
    PRIMARY KEY (staff_id, branch_id)
);

-- 同一员工同日可能存在多条排班记录（历史数据），读取时统一裁决
CREATE TABLE IF NOT EXISTS staff_schedule (
    schedule_id INTEGER PRIMARY KEY AUTOINCREMENT,
    staff_id INTEGER NOT NULL REFERENCES staff(staff_id) ON DELETE CASCADE,
    schedule_date TEXT NOT NULL,
    status TEXT NOT NULL CHECK(status IN ('WORKING', 'OFF', 'LEAVE', 'SICK_LEAVE'))
);

CREATE INDEX IF NOT EXISTS idx_schedule_staff_date ON staff_schedule(staff_id, schedule_date);

CREATE TABLE IF NOT EXISTS rotation_assignment (
    assignment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    staff_id INTEGER NOT NULL REFERENCES staff(staff_id),
    branch_id INTEGER NOT NULL REFERENCES branch(branch_id),
    assignment_date TEXT NOT NULL,
    assignment_level INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    UNIQUE (staff_id, branch_id, assignment_date)
);

CREATE INDEX IF NOT EXISTS idx_rotation_branch_date ON rotation_assignment(branch_id, assignment_date);

-- ===== 医生 =====
CREATE TABLE IF NOT EXISTS doctor (
    doctor_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS doctor_assignment (
    doctor_id INTEGER NOT NULL REFERENCES doctor(doctor_id),
    branch_id INTEGER NOT NULL REFERENCES branch(branch_id),
    assignment_date TEXT NOT NULL,
    expected_revenue REAL NOT NULL DEFAULT 0,
    PRIMARY KEY (doctor_id, branch_id, assignment_date)
);

CREATE INDEX IF NOT EXISTS idx_doctor_assignment_branch_date ON doctor_assignment(branch_id, assignment_date);

CREATE TABLE IF NOT EXISTS doctor_preference (
    preference_id INTEGER PRIMARY KEY AUTOINCREMENT,
    doctor_id INTEGER NOT NULL REFERENCES doctor(doctor_id) ON DELETE CASCADE,
    requirement_json TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

-- ===== 评分项与场景 =====
CREATE TABLE IF NOT EXISTS allocation_criterion (
    criterion_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    criterion_type TEXT NOT NULL,
    pillar TEXT NOT NULL CHECK(pillar IN ('CLINIC_WIDE', 'DOCTOR_SPECIFIC', 'BRANCH_SPECIFIC')),
    weight REAL NOT NULL DEFAULT 1.0,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS staff_requirement_scenario (
    scenario_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    day_of_week INTEGER CHECK(day_of_week BETWEEN 1 AND 7),
    revenue_tier_id INTEGER REFERENCES revenue_tier(tier_id),
    revenue_min REAL,
    revenue_max REAL,
    use_day_of_week_revenue INTEGER NOT NULL DEFAULT 0,
    use_specific_date_revenue INTEGER NOT NULL DEFAULT 0,
    doctor_count INTEGER,
    min_doctor_count INTEGER
);

CREATE TABLE IF NOT EXISTS scenario_position_requirement (
    scenario_id INTEGER NOT NULL REFERENCES staff_requirement_scenario(scenario_id) ON DELETE CASCADE,
    position_id INTEGER NOT NULL REFERENCES position(position_id),
    preferred_staff INTEGER NOT NULL DEFAULT 0,
    minimum_staff INTEGER NOT NULL DEFAULT 0,
    override_base INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (scenario_id, position_id)
);

-- ===== 调配建议 =====
CREATE TABLE IF NOT EXISTS allocation_suggestion (
    suggestion_id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    staff_id INTEGER NOT NULL REFERENCES staff(staff_id),
    staff_nickname TEXT NOT NULL,
    branch_id INTEGER NOT NULL REFERENCES branch(branch_id),
    position_id INTEGER NOT NULL REFERENCES position(position_id),
    suggestion_date TEXT NOT NULL,
    confidence REAL NOT NULL,
    reason TEXT NOT NULL,
    status TEXT NOT NULL CHECK(status IN ('PENDING', 'APPROVED', 'REJECTED')),
    created_at TEXT NOT NULL,
    reviewed_by TEXT,
    reviewed_at TEXT,
    review_note TEXT
);

CREATE INDEX IF NOT EXISTS idx_suggestion_status ON allocation_suggestion(status, suggestion_date);

-- ===== 汇总缓存 =====
CREATE TABLE IF NOT EXISTS branch_daily_summary (
    branch_id INTEGER NOT NULL REFERENCES branch(branch_id) ON DELETE CASCADE,
    summary_date TEXT NOT NULL,
    revision INTEGER NOT NULL,
    payload_json TEXT NOT NULL,
    refreshed_at TEXT NOT NULL,
    PRIMARY KEY (branch_id, summary_date)
);
"#;
