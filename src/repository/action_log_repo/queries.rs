use super::core::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT action_id, action_type, child_id, actor, action_ts, payload_json, detail
    FROM action_log
"#;

impl<'a> ActionLogRepository<'a> {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询指定儿童的操作日志 (时间倒序)
    pub fn find_by_child(&self, child_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let sql = format!(
            "{} WHERE child_id = ?1 ORDER BY action_ts DESC, action_id",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![child_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 按操作类型查询
    pub fn find_by_type(&self, action_type: ActionType) -> RepositoryResult<Vec<ActionLog>> {
        let sql = format!(
            "{} WHERE action_type = ?1 ORDER BY action_ts DESC, action_id",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![action_type.as_str()], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 查询最近 N 条日志
    pub fn find_recent(&self, limit: usize) -> RepositoryResult<Vec<ActionLog>> {
        let sql = format!(
            "{} ORDER BY action_ts DESC, action_id LIMIT ?1",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit as i64], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }
}

/// 行映射
///
/// 未知 action_type 视为数据损坏,payload_json 解析失败时置空
fn map_row(row: &Row<'_>) -> SqliteResult<ActionLog> {
    let action_type_raw: String = row.get(1)?;
    let action_type = ActionType::parse(&action_type_raw).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(1, action_type_raw.clone(), rusqlite::types::Type::Text)
    })?;

    let payload_json: Option<String> = row.get(5)?;

    Ok(ActionLog {
        action_id: row.get(0)?,
        action_type,
        child_id: row.get(2)?,
        actor: row.get(3)?,
        action_ts: row.get(4)?,
        payload_json: payload_json.and_then(|s| serde_json::from_str(&s).ok()),
        detail: row.get(6)?,
    })
}
