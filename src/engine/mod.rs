// ==========================================
// 托育候补名单系统 - 引擎层
// ==========================================
// 职责: 评分、候补排名、名额容量、名额匹配
// 红线: 引擎不拼 SQL, 数据访问经由 repository
// 红线: 每个公开操作对应一个原子事务
// ==========================================

pub mod allocation;
pub(crate) mod audit;
pub mod capacity;
pub mod clock;
pub mod error;
pub mod scoring;
pub mod waitlist;

// 重导出核心引擎
pub use allocation::{AllocationMatcher, AllocationRunParams};
pub use capacity::CapacityTracker;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{EngineError, EngineResult};
pub use scoring::{CriterionOutcome, ScoreResult, ScoringEngine};
pub use waitlist::{ReorderSummary, WaitlistManager};
