// ==========================================
// 集成测试辅助模块
// ==========================================

#![allow(dead_code)]

pub mod fixture_builder;
pub mod mock_config;

pub use fixture_builder::{blank_scenario, day, Fixture};
pub use mock_config::MockConfig;
