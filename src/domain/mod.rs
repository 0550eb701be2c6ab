// ==========================================
// 托育候补名单系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod allocation;
pub mod child;
pub mod criterion;
pub mod daycare;
pub mod types;
pub mod waitlist;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use allocation::{Allocation, AllocationDetail, AllocationOptions, AllocationRunResult};
pub use child::{Child, DaycarePreference, FactValue, AGE_MONTHS_FACT, DEFAULT_MAX_PREFERENCES};
pub use criterion::{AppliedCriterion, Comparator, Criterion, CriterionRule};
pub use daycare::{ClassGroup, Daycare, GroupAvailability};
pub use types::{
    AllocationStatus, ChildStatus, CriterionKind, ParseEnumError, RemovalReason, Shift,
    WaitlistStatus,
};
pub use waitlist::{queue_order, WaitlistEntry, PLACEHOLDER_POSITION};
