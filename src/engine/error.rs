// ==========================================
// 轮岗人员调配系统 - 引擎层错误类型
// ==========================================
// 职责: 统一引擎层错误，携带操作上下文
// 红线: 主数据失败立即向上传播; 辅助数据失败由调用方降级处理
// ==========================================

use crate::config::allocation_config_trait::ConfigResult;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 仓储错误（附带失败的操作）
    #[error("{context}: {source}")]
    Repository {
        context: String,
        #[source]
        source: RepositoryError,
    },

    #[error("资源未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            RepositoryError::InvalidStateTransition { from, to } => {
                EngineError::InvalidStateTransition { from, to }
            }
            RepositoryError::ValidationError(msg) => EngineError::ValidationError(msg),
            other => EngineError::Repository {
                context: "数据访问失败".to_string(),
                source: other,
            },
        }
    }
}

/// 引擎层 Result 类型
pub type EngineResult<T> = Result<T, EngineError>;

// ==========================================
// 上下文扩展
// ==========================================

/// 为仓储结果附加操作上下文
pub trait RepositoryContext<T> {
    fn context(self, context: impl FnOnce() -> String) -> EngineResult<T>;
}

impl<T> RepositoryContext<T> for Result<T, RepositoryError> {
    fn context(self, context: impl FnOnce() -> String) -> EngineResult<T> {
        self.map_err(|source| match source {
            RepositoryError::NotFound { .. }
            | RepositoryError::InvalidStateTransition { .. }
            | RepositoryError::ValidationError(_) => EngineError::from(source),
            other => EngineError::Repository {
                context: context(),
                source: other,
            },
        })
    }
}

/// 配置读取结果转换
pub(crate) fn config_value<T>(result: ConfigResult<T>, key: &str) -> EngineResult<T> {
    result.map_err(|e| EngineError::ConfigError(format!("{}: {}", key, e)))
}
