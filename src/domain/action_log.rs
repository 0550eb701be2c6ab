// ==========================================
// 托育候补名单系统 - 操作日志领域模型
// ==========================================
// 红线: 核心状态写入必须记录
// 用途: 审计追踪 (排名变化、分配结果)
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: ActionType,
    pub child_id: Option<String>, // 系统级操作 (重排/分配轮次) 为 None
    pub actor: String,
    pub action_ts: NaiveDateTime,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Enqueue,        // 进入候补
    Remove,         // 移出候补
    Pause,          // 行政暂停
    Resume,         // 恢复排队
    Withdraw,       // 儿童退出
    Reorder,        // 全量重排
    RecomputeScore, // 重算分数
    Allocate,       // 单个分配
    AllocationRun,  // 分配轮次
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Enqueue => "Enqueue",
            ActionType::Remove => "Remove",
            ActionType::Pause => "Pause",
            ActionType::Resume => "Resume",
            ActionType::Withdraw => "Withdraw",
            ActionType::Reorder => "Reorder",
            ActionType::RecomputeScore => "RecomputeScore",
            ActionType::Allocate => "Allocate",
            ActionType::AllocationRun => "AllocationRun",
        }
    }

    /// 从字符串解析 (未知值返回 None)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Enqueue" => Some(ActionType::Enqueue),
            "Remove" => Some(ActionType::Remove),
            "Pause" => Some(ActionType::Pause),
            "Resume" => Some(ActionType::Resume),
            "Withdraw" => Some(ActionType::Withdraw),
            "Reorder" => Some(ActionType::Reorder),
            "RecomputeScore" => Some(ActionType::RecomputeScore),
            "Allocate" => Some(ActionType::Allocate),
            "AllocationRun" => Some(ActionType::AllocationRun),
            _ => None,
        }
    }
}
