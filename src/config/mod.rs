// ==========================================
// 轮岗人员调配系统 - 配置层
// ==========================================
// 职责: 评分/排名/建议生成的运行时配置
// 存储: config_kv 表
// ==========================================

pub mod allocation_config_trait;
pub mod config_manager;

// 重导出核心配置管理器
pub use allocation_config_trait::{AllocationConfigReader, ConfigResult};
pub use config_manager::{config_keys, defaults, parse_priority_order, ConfigManager};
