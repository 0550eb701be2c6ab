// ==========================================
// 托育候补名单系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 市立托育机构候补名单的优先级评分与名额分配
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

// 数据库基础设施（连接初始化/PRAGMA/schema 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AllocationStatus, ChildStatus, CriterionKind, RemovalReason, Shift, WaitlistStatus,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Allocation, AllocationDetail, AllocationOptions, AllocationRunResult,
    AppliedCriterion, Child, ClassGroup, Criterion, CriterionRule, Daycare, DaycarePreference,
    FactValue, WaitlistEntry,
};

// 引擎
pub use engine::{
    AllocationMatcher, CapacityTracker, Clock, EngineError, FixedClock, ScoringEngine,
    SystemClock, WaitlistManager,
};

// API
pub use api::{ApiError, ApiResult, WaitlistApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "托育候补名单系统";

// 数据库版本
pub const DB_VERSION: &str = "v1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(DB_VERSION, format!("v{}", db::CURRENT_SCHEMA_VERSION));
    }
}
