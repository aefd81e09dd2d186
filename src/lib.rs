// ==========================================
// 轮岗人员调配系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + tokio
// 系统定位: 决策支持系统 (调配建议需人工审核)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 应用服务 - 组装入口
pub mod service;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    CriterionType, Pillar, RankingCriterion, RevenueSource, ScheduleStatus, StaffType,
    SuggestionStatus,
};

// 领域实体
pub use domain::{
    AllocationScore, AllocationSuggestion, BranchQuotaStatus, CalculatedRequirement,
    PreferenceRequirement, RankedSuggestion,
};

// 引擎
pub use engine::{
    ConstraintResolver, CriteriaEngine, EngineError, EngineResult, MultiCriteriaFilter,
    QuotaCalculator, ScenarioCalculator, SuggestionEngine, SummaryRefreshQueue,
};

// 服务
pub use service::{AllocationService, ServiceOptions};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "轮岗人员调配系统";
