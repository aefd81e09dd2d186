// ==========================================
// 轮岗人员调配系统 - 应用服务
// ==========================================
// 职责: 组装仓储、配置、回写队列与各引擎，对外提供统一入口
// 说明: 单一共享连接; 回写队列需在 tokio 运行时内创建
// ==========================================

use crate::config::ConfigManager;
use crate::db::open_sqlite_connection;
use crate::domain::types::{RankingCriterion, SuggestionStatus};
use crate::domain::{
    AllocationScore, AllocationSuggestion, BranchQuotaStatus, CalculatedRequirement,
    RankedSuggestion, RotationAssignment,
};
use crate::engine::error::{EngineError, EngineResult, RepositoryContext};
use crate::engine::{
    CriteriaEngine, MultiCriteriaFilter, QueueStats, QuotaCalculator, ScenarioCalculator,
    SuggestionEngine, SummaryRefreshQueue,
};
use crate::repository::contracts::{BranchReader, SummaryCache};
use crate::repository::SqliteStaffingRepository;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

type Repo = SqliteStaffingRepository;

/// 服务选项
#[derive(Debug, Clone, Copy)]
pub struct ServiceOptions {
    /// 岗位目标是否经场景解析
    pub use_scenarios: bool,
    /// 是否启用分院当日汇总缓存（含回写队列）
    pub use_summary_cache: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            use_scenarios: false,
            use_summary_cache: true,
        }
    }
}

// ==========================================
// AllocationService - 应用服务
// ==========================================
pub struct AllocationService {
    pub repo: Arc<Repo>,
    pub config: Arc<ConfigManager>,
    pub refresh_queue: Option<Arc<SummaryRefreshQueue>>,
    pub quota_calculator: Arc<QuotaCalculator<Repo>>,
    pub scenario_calculator: Arc<ScenarioCalculator<Repo>>,
    pub criteria_engine: Arc<CriteriaEngine<Repo, ConfigManager>>,
    pub multi_criteria_filter: Arc<MultiCriteriaFilter<Repo, ConfigManager>>,
    pub suggestion_engine: Arc<SuggestionEngine<Repo, ConfigManager>>,
}

impl AllocationService {
    /// 打开数据库文件并初始化 schema
    pub fn open(db_path: &str, options: ServiceOptions) -> EngineResult<Self> {
        tracing::info!(db_path, "初始化调配服务");
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| EngineError::Other(anyhow::anyhow!("无法打开数据库 {}: {}", db_path, e)))?;
        Self::from_connection(Arc::new(Mutex::new(conn)), options)
    }

    /// 基于已有连接组装服务（共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>, options: ServiceOptions) -> EngineResult<Self> {
        let repo = Arc::new(
            SqliteStaffingRepository::from_connection(conn.clone())
                .context(|| "创建人员配置仓储".to_string())?,
        );
        repo.ensure_schema().context(|| "初始化 schema".to_string())?;

        let config = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| EngineError::ConfigError(e.to_string()))?,
        );

        let mut quota = QuotaCalculator::new(repo.clone());
        if options.use_scenarios {
            quota = quota.with_scenarios();
        }
        let refresh_queue = if options.use_summary_cache {
            let queue = Arc::new(SummaryRefreshQueue::start(repo.clone())?);
            let cache: Arc<dyn SummaryCache> = repo.clone();
            quota = quota.with_cache(cache, queue.clone());
            Some(queue)
        } else {
            None
        };
        let quota = Arc::new(quota);

        let criteria = Arc::new(CriteriaEngine::new(repo.clone(), config.clone(), quota.clone()));
        let filter = Arc::new(MultiCriteriaFilter::new(
            repo.clone(),
            config.clone(),
            quota.clone(),
            criteria.clone(),
        ));
        let suggestions = Arc::new(SuggestionEngine::new(
            repo.clone(),
            config.clone(),
            quota.clone(),
            criteria.clone(),
        ));

        tracing::info!(
            use_scenarios = options.use_scenarios,
            use_summary_cache = options.use_summary_cache,
            "调配服务初始化完成"
        );

        Ok(Self {
            scenario_calculator: Arc::new(ScenarioCalculator::new(repo.clone())),
            repo,
            config,
            refresh_queue,
            quota_calculator: quota,
            criteria_engine: criteria,
            multi_criteria_filter: filter,
            suggestion_engine: suggestions,
        })
    }

    // ===== 查询 =====

    pub fn branch_status(&self, branch_id: i64, date: NaiveDate) -> EngineResult<BranchQuotaStatus> {
        self.quota_calculator.calculate_branch_quota_status(branch_id, date)
    }

    pub async fn branch_score(&self, branch_id: i64, date: NaiveDate) -> EngineResult<AllocationScore> {
        self.criteria_engine.evaluate_criteria(branch_id, date).await
    }

    pub fn staff_requirement(
        &self,
        branch_id: i64,
        date: NaiveDate,
        position_id: i64,
        base_preferred: i32,
        base_minimum: i32,
    ) -> EngineResult<CalculatedRequirement> {
        self.scenario_calculator.calculate_staff_requirements(
            branch_id,
            date,
            position_id,
            base_preferred,
            base_minimum,
        )
    }

    /// 全部启用分院的全局排名（准则取配置默认值）
    pub async fn rank_all_branches(&self, date: NaiveDate) -> EngineResult<Vec<RankedSuggestion>> {
        let branch_ids = self.active_branch_ids()?;
        self.multi_criteria_filter
            .generate_with_defaults(&branch_ids, date)
            .await
    }

    pub async fn rank_branches(
        &self,
        branch_ids: &[i64],
        date: NaiveDate,
        priority_order: &[RankingCriterion],
        enable_doctor_preferences: bool,
    ) -> EngineResult<Vec<RankedSuggestion>> {
        self.multi_criteria_filter
            .generate_ranked_suggestions(branch_ids, date, priority_order, enable_doctor_preferences)
            .await
    }

    // ===== 调配建议 =====

    pub async fn generate_suggestions(
        &self,
        branch_ids: &[i64],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> EngineResult<Vec<AllocationSuggestion>> {
        self.suggestion_engine
            .generate_suggestions(branch_ids, start_date, end_date)
            .await
    }

    pub fn approve_suggestion(&self, suggestion_id: &str, reviewer: &str) -> EngineResult<RotationAssignment> {
        self.suggestion_engine.approve_suggestion(suggestion_id, reviewer)
    }

    pub fn reject_suggestion(
        &self,
        suggestion_id: &str,
        reviewer: &str,
        note: Option<&str>,
    ) -> EngineResult<()> {
        self.suggestion_engine
            .reject_suggestion(suggestion_id, reviewer, note)
    }

    pub fn pending_suggestions(&self) -> EngineResult<Vec<AllocationSuggestion>> {
        self.suggestion_engine.list_suggestions(SuggestionStatus::Pending)
    }

    // ===== 生命周期 =====

    pub fn queue_stats(&self) -> EngineResult<Option<QueueStats>> {
        self.refresh_queue.as_ref().map(|q| q.stats()).transpose()
    }

    /// 等待回写队列清空并停止 worker
    pub async fn shutdown(&self) -> EngineResult<()> {
        if let Some(queue) = &self.refresh_queue {
            queue.wait_idle().await?;
            queue.shutdown().await?;
        }
        Ok(())
    }

    fn active_branch_ids(&self) -> EngineResult<Vec<i64>> {
        Ok(self
            .repo
            .list_branches()
            .context(|| "加载分院列表".to_string())?
            .into_iter()
            .map(|b| b.branch_id)
            .collect())
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 ROTATION_ALLOCATION_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("ROTATION_ALLOCATION_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./rotation_allocation.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("rotation-allocation");
        match std::fs::create_dir_all(&dir) {
            Ok(()) => path = dir.join("rotation_allocation.db"),
            Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "无法创建数据目录，使用当前目录"),
        }
    }
    path.to_string_lossy().to_string()
}
