// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use rotation_allocation::config::{AllocationConfigReader, ConfigResult};
use rotation_allocation::domain::types::RankingCriterion;

/// Mock 配置结构
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub bookings_placeholder: f64,
    pub revenue_ceiling: f64,
    pub max_doctor_count: i32,
    pub high_activity_threshold: f64,
    pub skill_bonus_per_level: f64,
    pub priority_order: Vec<RankingCriterion>,
    pub enable_doctor_preferences: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            bookings_placeholder: 0.5,
            revenue_ceiling: 1_000_000.0,
            max_doctor_count: 5,
            high_activity_threshold: 0.7,
            skill_bonus_per_level: 0.05,
            priority_order: RankingCriterion::default_order(),
            enable_doctor_preferences: false,
        }
    }
}

impl MockConfig {
    /// 启用医生偏好过滤
    pub fn with_doctor_preferences() -> Self {
        let mut config = Self::default();
        config.enable_doctor_preferences = true;
        config.priority_order.insert(0, RankingCriterion::DoctorPreference);
        config
    }
}

#[async_trait]
impl AllocationConfigReader for MockConfig {
    async fn get_bookings_placeholder_score(&self) -> ConfigResult<f64> {
        Ok(self.bookings_placeholder)
    }

    async fn get_revenue_ceiling(&self) -> ConfigResult<f64> {
        Ok(self.revenue_ceiling)
    }

    async fn get_max_doctor_count(&self) -> ConfigResult<i32> {
        Ok(self.max_doctor_count)
    }

    async fn get_high_activity_threshold(&self) -> ConfigResult<f64> {
        Ok(self.high_activity_threshold)
    }

    async fn get_skill_bonus_per_level(&self) -> ConfigResult<f64> {
        Ok(self.skill_bonus_per_level)
    }

    async fn get_default_priority_order(&self) -> ConfigResult<Vec<RankingCriterion>> {
        Ok(self.priority_order.clone())
    }

    async fn get_enable_doctor_preferences(&self) -> ConfigResult<bool> {
        Ok(self.enable_doctor_preferences)
    }
}
