// ==========================================
// 轮岗人员调配系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::allocation_config_trait::{AllocationConfigReader, ConfigResult};
use crate::db::open_sqlite_connection;
use crate::domain::types::RankingCriterion;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// 默认值
// ==========================================
pub mod defaults {
    pub const BOOKINGS_PLACEHOLDER_SCORE: f64 = 0.5;
    pub const REVENUE_CEILING: f64 = 1_000_000.0;
    pub const MAX_DOCTOR_COUNT: i32 = 5;
    pub const HIGH_ACTIVITY_THRESHOLD: f64 = 0.7;
    pub const SKILL_BONUS_PER_LEVEL: f64 = 0.05;
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn lock(&self) -> ConfigResult<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?)
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 建议生成批次记录运行时配置，便于事后复盘
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 读取并解析数值配置；格式错误时告警并使用默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置值格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }
}

/// 解析排名准则列表（逗号分隔，忽略无法识别的项）
pub fn parse_priority_order(raw: &str) -> Vec<RankingCriterion> {
    let mut order = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match RankingCriterion::parse(token) {
            Some(criterion) if !order.contains(&criterion) => order.push(criterion),
            Some(_) => {}
            None => tracing::warn!(token, "无法识别的排名准则，已忽略"),
        }
    }
    order
}

// ==========================================
// AllocationConfigReader Trait 实现
// ==========================================
#[async_trait]
impl AllocationConfigReader for ConfigManager {
    async fn get_bookings_placeholder_score(&self) -> ConfigResult<f64> {
        let value = self.get_parsed_or_default(
            config_keys::BOOKINGS_PLACEHOLDER_SCORE,
            defaults::BOOKINGS_PLACEHOLDER_SCORE,
        )?;
        Ok(value.clamp(0.0, 1.0))
    }

    async fn get_revenue_ceiling(&self) -> ConfigResult<f64> {
        let value =
            self.get_parsed_or_default(config_keys::REVENUE_CEILING, defaults::REVENUE_CEILING)?;
        if value > 0.0 {
            Ok(value)
        } else {
            Ok(defaults::REVENUE_CEILING)
        }
    }

    async fn get_max_doctor_count(&self) -> ConfigResult<i32> {
        let value =
            self.get_parsed_or_default(config_keys::MAX_DOCTOR_COUNT, defaults::MAX_DOCTOR_COUNT)?;
        if value > 0 {
            Ok(value)
        } else {
            Ok(defaults::MAX_DOCTOR_COUNT)
        }
    }

    async fn get_high_activity_threshold(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(
            config_keys::HIGH_ACTIVITY_THRESHOLD,
            defaults::HIGH_ACTIVITY_THRESHOLD,
        )
    }

    async fn get_skill_bonus_per_level(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(
            config_keys::SKILL_BONUS_PER_LEVEL,
            defaults::SKILL_BONUS_PER_LEVEL,
        )
    }

    async fn get_default_priority_order(&self) -> ConfigResult<Vec<RankingCriterion>> {
        let order = match self.get_global_config_value(config_keys::DEFAULT_PRIORITY_ORDER)? {
            Some(raw) => parse_priority_order(&raw),
            None => Vec::new(),
        };
        if order.is_empty() {
            Ok(RankingCriterion::default_order())
        } else {
            Ok(order)
        }
    }

    async fn get_enable_doctor_preferences(&self) -> ConfigResult<bool> {
        let value = self.get_global_config_value(config_keys::ENABLE_DOCTOR_PREFERENCES)?;
        Ok(matches!(
            value.as_deref().map(|v| v.trim().to_lowercase()).as_deref(),
            Some("true") | Some("1") | Some("yes")
        ))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 评分
    pub const BOOKINGS_PLACEHOLDER_SCORE: &str = "bookings_placeholder_score";
    pub const REVENUE_CEILING: &str = "revenue_ceiling";
    pub const MAX_DOCTOR_COUNT: &str = "max_doctor_count";
    pub const HIGH_ACTIVITY_THRESHOLD: &str = "high_activity_threshold";

    // 建议生成
    pub const SKILL_BONUS_PER_LEVEL: &str = "skill_bonus_per_level";

    // 排名
    pub const DEFAULT_PRIORITY_ORDER: &str = "default_priority_order"; // 逗号分隔
    pub const ENABLE_DOCTOR_PREFERENCES: &str = "enable_doctor_preferences";
}
