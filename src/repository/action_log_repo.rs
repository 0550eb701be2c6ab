// ==========================================
// 托育候补名单系统 - 操作日志数据仓储
// ==========================================
// 红线: 核心状态写入必须记录
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::ActionLogRepository;
