// ==========================================
// 轮岗人员调配系统 - 调配配置读取 Trait
// ==========================================
// 职责: 定义引擎层所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::RankingCriterion;
use async_trait::async_trait;
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// AllocationConfigReader Trait
// ==========================================
// 用途: 评分、排名、建议生成所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait AllocationConfigReader: Send + Sync {
    // ===== 评分配置 =====

    /// 预约量评分占位值（外部预约系统未接入）
    ///
    /// # 默认值
    /// - 0.5
    async fn get_bookings_placeholder_score(&self) -> ConfigResult<f64>;

    /// 营收评分上限（营收 / 上限，截断到 1.0）
    ///
    /// # 默认值
    /// - 1_000_000.0
    async fn get_revenue_ceiling(&self) -> ConfigResult<f64>;

    /// 医生人数评分上限
    ///
    /// # 默认值
    /// - 5
    async fn get_max_doctor_count(&self) -> ConfigResult<i32>;

    /// 高活跃阈值（综合评分 ≥ 阈值视为高活跃）
    ///
    /// # 默认值
    /// - 0.7
    async fn get_high_activity_threshold(&self) -> ConfigResult<f64>;

    // ===== 建议生成配置 =====

    /// 每级技能加成（confidence = 综合评分 + 技能等级 × 加成）
    ///
    /// # 默认值
    /// - 0.05
    async fn get_skill_bonus_per_level(&self) -> ConfigResult<f64>;

    // ===== 排名配置 =====

    /// 默认排名准则
    ///
    /// # 默认值
    /// - STAFF_GROUP_MINIMUM,POSITION_MINIMUM,POSITION_PREFERRED
    async fn get_default_priority_order(&self) -> ConfigResult<Vec<RankingCriterion>>;

    /// 是否默认启用医生偏好过滤
    ///
    /// # 默认值
    /// - false
    async fn get_enable_doctor_preferences(&self) -> ConfigResult<bool>;
}
