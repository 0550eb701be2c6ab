// ==========================================
// 托育候补名单系统 - API层错误类型
// ==========================================
// 职责: 将引擎/仓储错误转换为调用方可理解的错误消息
// 红线: 所有错误信息必须包含显式原因
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 调用方可修正的错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 档案缺少评分所需事实
    #[error("儿童档案无法评分: {0}")]
    InvalidChildState(String),

    #[error("重复候补: {0}")]
    DuplicateEntry(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 结构性错误 (操作已整体回滚)
    // ==========================================
    /// 名额不变量违反 (内部缺陷)
    #[error("名额不变量违反: {0}")]
    CapacityInvariantViolation(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 调用方修正输入后可重试
    pub fn is_caller_correctable(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidInput(_)
                | ApiError::NotFound(_)
                | ApiError::InvalidChildState(_)
                | ApiError::DuplicateEntry(_)
                | ApiError::BusinessRuleViolation(_)
                | ApiError::InvalidStateTransition { .. }
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::SerializationError(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            e @ EngineError::InvalidChildState { .. } => ApiError::InvalidChildState(e.to_string()),
            e @ EngineError::DuplicateActiveEntry { .. } => ApiError::DuplicateEntry(e.to_string()),
            e @ EngineError::CapacityExceededAttempt { .. } => {
                ApiError::CapacityInvariantViolation(e.to_string())
            }
            EngineError::InvalidStateTransition { child_id, from, to } => {
                ApiError::InvalidStateTransition {
                    from: format!("{}({})", from, child_id),
                    to,
                }
            }
            e @ EngineError::InvalidPreferences { .. } => ApiError::InvalidInput(e.to_string()),
            EngineError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            EngineError::TransactionFailure(repo_err) => repo_err.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_errors_keep_their_category() {
        let dup: ApiError = EngineError::DuplicateActiveEntry {
            child_id: "C1".to_string(),
            entry_id: "E1".to_string(),
        }
        .into();
        assert!(matches!(dup, ApiError::DuplicateEntry(_)));
        assert!(dup.is_caller_correctable());

        let cap: ApiError = EngineError::CapacityExceededAttempt {
            daycare_id: "D1".to_string(),
            child_id: "C1".to_string(),
            detail: "no group".to_string(),
        }
        .into();
        assert!(matches!(cap, ApiError::CapacityInvariantViolation(_)));
        assert!(!cap.is_caller_correctable());

        let tx: ApiError =
            EngineError::TransactionFailure(RepositoryError::LockError("poisoned".to_string()))
                .into();
        assert!(matches!(tx, ApiError::DatabaseConnectionError(_)));
    }
}
