// ==========================================
// 托育候补名单系统 - 配置层
// ==========================================
// 职责: 引擎默认参数管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, AllocationDefaults, ConfigManager};
