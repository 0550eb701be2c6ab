// ==========================================
// 托育候补名单系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行及嵌入方调用
// ==========================================

pub mod error;
pub mod waitlist_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use waitlist_api::{SeedChild, SeedData, SeedSummary, WaitlistApi};
