// ==========================================
// 托育候补名单系统 - 引擎操作审计
// ==========================================
// 红线: 核心状态写入必须与业务写入处于同一事务
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::engine::error::EngineResult;
use crate::repository::ActionLogRepository;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// 写入一条操作日志
pub(crate) fn record(
    conn: &Connection,
    action_type: ActionType,
    child_id: Option<&str>,
    actor: &str,
    now: DateTime<Utc>,
    payload: Option<JsonValue>,
    detail: Option<String>,
) -> EngineResult<()> {
    let log = ActionLog {
        action_id: Uuid::new_v4().to_string(),
        action_type,
        child_id: child_id.map(|s| s.to_string()),
        actor: actor.to_string(),
        action_ts: now.naive_utc(),
        payload_json: payload,
        detail,
    };
    ActionLogRepository::new(conn).insert(&log)?;
    Ok(())
}
