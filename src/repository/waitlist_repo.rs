// ==========================================
// 托育候补名单系统 - 候补条目数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑 (排序规则在 WaitlistManager)
// 红线: 不提供 "COUNT(*)+1" 式的排名接口
// ==========================================

use crate::domain::criterion::AppliedCriterion;
use crate::domain::types::WaitlistStatus;
use crate::domain::waitlist::WaitlistEntry;
use crate::repository::error::{parse_column, parse_json_column, RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};

const SELECT_COLUMNS: &str = r#"
    SELECT entry_id, child_id, total_score, applied_json, position,
           enrollment_date, status, updated_at
    FROM waitlist_entry
"#;

// ==========================================
// WaitlistRepository - 候补条目仓储
// ==========================================
pub struct WaitlistRepository<'a> {
    conn: &'a Connection,
}

impl<'a> WaitlistRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 插入候补条目
    ///
    /// 活跃条目唯一性由部分唯一索引兜底,冲突时返回 UniqueConstraintViolation
    pub fn insert(&self, entry: &WaitlistEntry) -> RepositoryResult<()> {
        let applied_json = serde_json::to_string(&entry.applied_criteria)?;
        self.conn.execute(
            r#"
            INSERT INTO waitlist_entry (
                entry_id, child_id, total_score, applied_json, position,
                enrollment_date, status, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                entry.entry_id,
                entry.child_id,
                entry.total_score,
                applied_json,
                entry.position,
                entry.enrollment_date,
                entry.status.as_str(),
                entry.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 查询儿童的活跃条目 (WAITING / PAUSED)
    pub fn find_active_by_child(&self, child_id: &str) -> RepositoryResult<Option<WaitlistEntry>> {
        let sql = format!(
            "{} WHERE child_id = ?1 AND status IN ('WAITING', 'PAUSED')",
            SELECT_COLUMNS
        );
        let entry = self
            .conn
            .query_row(&sql, params![child_id], map_entry_row)
            .optional()?;
        Ok(entry)
    }

    /// 查询儿童的全部条目 (含历史)
    pub fn find_by_child(&self, child_id: &str) -> RepositoryResult<Vec<WaitlistEntry>> {
        let sql = format!(
            "{} WHERE child_id = ?1 ORDER BY enrollment_date, entry_id",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let list = stmt
            .query_map(params![child_id], map_entry_row)?
            .collect::<SqliteResult<Vec<WaitlistEntry>>>()?;
        Ok(list)
    }

    /// 按状态查询条目 (无序,排序由调用方决定)
    pub fn find_by_status(&self, status: WaitlistStatus) -> RepositoryResult<Vec<WaitlistEntry>> {
        let sql = format!("{} WHERE status = ?1 ORDER BY entry_id", SELECT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let list = stmt
            .query_map(params![status.as_str()], map_entry_row)?
            .collect::<SqliteResult<Vec<WaitlistEntry>>>()?;
        Ok(list)
    }

    /// 查询排队中条目,按 position 升序 (最高优先在前)
    pub fn find_waiting_ordered(&self) -> RepositoryResult<Vec<WaitlistEntry>> {
        let sql = format!(
            "{} WHERE status = 'WAITING' ORDER BY position, entry_id",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let list = stmt
            .query_map([], map_entry_row)?
            .collect::<SqliteResult<Vec<WaitlistEntry>>>()?;
        Ok(list)
    }

    /// 更新分数与已生效标准快照
    pub fn update_score(
        &self,
        entry_id: &str,
        total_score: u32,
        applied: &[AppliedCriterion],
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let applied_json = serde_json::to_string(applied)?;
        let affected = self.conn.execute(
            r#"
            UPDATE waitlist_entry
            SET total_score = ?1, applied_json = ?2, updated_at = ?3
            WHERE entry_id = ?4
            "#,
            params![total_score, applied_json, updated_at, entry_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("WaitlistEntry", entry_id));
        }
        Ok(())
    }

    /// 更新状态与排名
    pub fn update_status(
        &self,
        entry_id: &str,
        status: WaitlistStatus,
        position: i64,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            r#"
            UPDATE waitlist_entry
            SET status = ?1, position = ?2, updated_at = ?3
            WHERE entry_id = ?4
            "#,
            params![status.as_str(), position, updated_at, entry_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("WaitlistEntry", entry_id));
        }
        Ok(())
    }

    /// 批量写入排名
    ///
    /// # 参数
    /// - positions: (entry_id, position) 列表
    ///
    /// # 返回
    /// - Ok(usize): 实际变更的记录数 (排名未变化的行不计入)
    ///
    /// # 红线
    /// - 必须在调用方事务中完成
    pub fn update_positions(
        &self,
        positions: &[(String, i64)],
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let mut stmt = self.conn.prepare(
            r#"
            UPDATE waitlist_entry
            SET position = ?1, updated_at = ?2
            WHERE entry_id = ?3 AND position <> ?1
            "#,
        )?;

        let mut changed = 0;
        for (entry_id, position) in positions {
            changed += stmt.execute(params![position, updated_at, entry_id])?;
        }
        Ok(changed)
    }
}

fn map_entry_row(row: &rusqlite::Row<'_>) -> SqliteResult<WaitlistEntry> {
    Ok(WaitlistEntry {
        entry_id: row.get(0)?,
        child_id: row.get(1)?,
        total_score: row.get(2)?,
        applied_criteria: parse_json_column(3, row.get::<_, String>(3)?)?,
        position: row.get(4)?,
        enrollment_date: row.get(5)?,
        status: parse_column(6, row.get::<_, String>(6)?)?,
        updated_at: row.get(7)?,
    })
}
