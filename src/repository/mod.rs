// ==========================================
// 轮岗人员调配系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod contracts;
pub mod error;
pub mod staffing_repo;
pub mod suggestion_repo;
pub mod summary_repo;

// 重导出核心仓储
pub use contracts::{
    BranchReader, DoctorReader, QuotaReader, RuleReader, StaffReader, StaffingRepository,
    SuggestionRepository, SummaryCache,
};
pub use error::{RepositoryError, RepositoryResult};
pub use staffing_repo::SqliteStaffingRepository;
