// ==========================================
// 托育候补名单系统 - 名额分配数据仓储
// ==========================================
// 红线: 占用数 = ACTIVE 分配计数,不维护累加器
// ==========================================

use crate::domain::allocation::Allocation;
use crate::domain::types::AllocationStatus;
use crate::repository::error::{parse_column, RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};

const SELECT_COLUMNS: &str = r#"
    SELECT allocation_id, child_id, daycare_id, group_id, start_date,
           end_date, status, created_at
    FROM allocation
"#;

/// 名额分配仓储
pub struct AllocationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> AllocationRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 插入分配记录
    ///
    /// ACTIVE 唯一性由部分唯一索引兜底
    pub fn insert(&self, allocation: &Allocation) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO allocation (
                allocation_id, child_id, daycare_id, group_id, start_date,
                end_date, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                allocation.allocation_id,
                allocation.child_id,
                allocation.daycare_id,
                allocation.group_id,
                allocation.start_date,
                allocation.end_date,
                allocation.status.as_str(),
                allocation.created_at,
            ],
        )?;
        Ok(())
    }

    /// 查询儿童当前 ACTIVE 分配
    pub fn find_active_by_child(&self, child_id: &str) -> RepositoryResult<Option<Allocation>> {
        let sql = format!("{} WHERE child_id = ?1 AND status = 'ACTIVE'", SELECT_COLUMNS);
        let allocation = self
            .conn
            .query_row(&sql, params![child_id], map_allocation_row)
            .optional()?;
        Ok(allocation)
    }

    pub fn find_by_child(&self, child_id: &str) -> RepositoryResult<Vec<Allocation>> {
        let sql = format!(
            "{} WHERE child_id = ?1 ORDER BY created_at, allocation_id",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let list = stmt
            .query_map(params![child_id], map_allocation_row)?
            .collect::<SqliteResult<Vec<Allocation>>>()?;
        Ok(list)
    }

    /// 班组当前占用 (ACTIVE 分配数)
    pub fn count_active_by_group(&self, group_id: &str) -> RepositoryResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM allocation WHERE group_id = ?1 AND status = 'ACTIVE'",
            params![group_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 结束/取消分配
    pub fn close(
        &self,
        allocation_id: &str,
        status: AllocationStatus,
        end_date: NaiveDate,
    ) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            "UPDATE allocation SET status = ?1, end_date = ?2 WHERE allocation_id = ?3",
            params![status.as_str(), end_date, allocation_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Allocation", allocation_id));
        }
        Ok(())
    }
}

fn map_allocation_row(row: &rusqlite::Row<'_>) -> SqliteResult<Allocation> {
    Ok(Allocation {
        allocation_id: row.get(0)?,
        child_id: row.get(1)?,
        daycare_id: row.get(2)?,
        group_id: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        status: parse_column(6, row.get::<_, String>(6)?)?,
        created_at: row.get(7)?,
    })
}
