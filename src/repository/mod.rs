// ==========================================
// 托育候补名单系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑,只返回普通数据结构
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 事务: 仓储借用调用方连接, 由 SqliteStore 统一开启/提交事务
// ==========================================

pub mod action_log_repo;
pub mod allocation_repo;
pub mod child_repo;
pub mod criterion_repo;
pub mod daycare_repo;
pub mod error;
pub mod store;
pub mod waitlist_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use allocation_repo::AllocationRepository;
pub use child_repo::ChildRepository;
pub use criterion_repo::CriterionRepository;
pub use daycare_repo::DaycareRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use store::SqliteStore;
pub use waitlist_repo::WaitlistRepository;
