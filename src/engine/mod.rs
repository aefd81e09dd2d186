// ==========================================
// 轮岗人员调配系统 - 引擎层
// ==========================================
// 职责: 配额计算、加权评分、场景匹配、全局排名、调配建议
// 红线: Engine 不拼 SQL, 所有规则必须输出 reason
// ==========================================

pub mod constraint_resolver;
pub mod criteria_engine;
pub mod error;
pub mod multi_criteria_filter;
pub mod quota_calculator;
pub mod refresh_queue;
pub mod scenario_calculator;
pub mod suggestion_engine;

// 重导出核心引擎
pub use constraint_resolver::{ConstraintResolver, GroupConstraint};
pub use criteria_engine::CriteriaEngine;
pub use error::{EngineError, EngineResult};
pub use multi_criteria_filter::MultiCriteriaFilter;
pub use quota_calculator::{QuotaCalculator, ScheduleIndex};
pub use refresh_queue::{QueueStats, SummaryRefreshQueue};
pub use scenario_calculator::{ScenarioCalculator, ScenarioContext, ScenarioPlan};
pub use suggestion_engine::SuggestionEngine;
