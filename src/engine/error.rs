// ==========================================
// 托育候补名单系统 - 引擎层错误类型
// ==========================================
// 分类:
// - 调用方可修正的输入错误: InvalidChildState / DuplicateActiveEntry /
//   InvalidPreferences / InvalidStateTransition / NotFound
// - 结构性错误 (整体回滚): TransactionFailure / CapacityExceededAttempt
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 评分标准无法评估 (缺少或类型不符的档案事实)
    ///
    /// 与 "不满足" 不同: 不满足贡献 0 分,无法评估必须上报
    #[error("儿童档案无法评估: child_id={child_id}, criterion_id={criterion_id}: {reason}")]
    InvalidChildState {
        child_id: String,
        criterion_id: String,
        reason: String,
    },

    #[error("儿童已有活跃候补条目: child_id={child_id}, entry_id={entry_id}")]
    DuplicateActiveEntry { child_id: String, entry_id: String },

    /// 内部不变量违反: 正确的匹配实现不应出现
    #[error("名额超限尝试: daycare_id={daycare_id}, child_id={child_id}: {detail}")]
    CapacityExceededAttempt {
        daycare_id: String,
        child_id: String,
        detail: String,
    },

    #[error("无效的状态转换: child_id={child_id}, from={from} to={to}")]
    InvalidStateTransition {
        child_id: String,
        from: String,
        to: String,
    },

    #[error("志愿无效: child_id={child_id}: {reason}")]
    InvalidPreferences { child_id: String, reason: String },

    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("事务失败: {0}")]
    TransactionFailure(RepositoryError),
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => EngineError::TransactionFailure(other),
        }
    }
}

impl EngineError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// 是否为调用方可修正的输入错误
    pub fn is_caller_correctable(&self) -> bool {
        !matches!(
            self,
            EngineError::TransactionFailure(_) | EngineError::CapacityExceededAttempt { .. }
        )
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
