// ==========================================
// 托育候补名单系统 - 儿童数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 不提供物理删除
// ==========================================

use crate::domain::child::{Child, DaycarePreference, FactValue};
use crate::domain::types::ChildStatus;
use crate::repository::error::{parse_column, parse_json_column, RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::collections::BTreeMap;

// ==========================================
// ChildRepository - 儿童仓储
// ==========================================

/// 儿童仓储
/// 职责: 管理 child / child_preference 表
///
/// 借用调用方的连接 (可以是事务),以便与其他仓储共享同一工作单元
pub struct ChildRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ChildRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 新增儿童 (含志愿)
    pub fn insert(&self, child: &Child) -> RepositoryResult<()> {
        let profile_json = serde_json::to_string(&child.profile)?;

        self.conn.execute(
            r#"
            INSERT INTO child (
                child_id, name, birth_date, status, profile_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                child.child_id,
                child.name,
                child.birth_date,
                child.status.as_str(),
                profile_json,
                child.created_at,
                child.updated_at,
            ],
        )?;

        self.insert_preferences(&child.child_id, &child.preferences)?;
        Ok(())
    }

    /// 按ID查询儿童
    ///
    /// # 返回
    /// - Ok(Some(Child)): 找到 (志愿按 rank 升序)
    /// - Ok(None): 未找到
    /// - Err: 数据库错误
    pub fn find_by_id(&self, child_id: &str) -> RepositoryResult<Option<Child>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT child_id, name, birth_date, status, profile_json, created_at, updated_at
                FROM child
                WHERE child_id = ?1
                "#,
                params![child_id],
                map_child_row,
            )
            .optional()?;

        match row {
            Some(mut child) => {
                child.preferences = self.find_preferences(child_id)?;
                Ok(Some(child))
            }
            None => Ok(None),
        }
    }

    /// 按ID查询儿童,不存在时返回 NotFound
    pub fn get(&self, child_id: &str) -> RepositoryResult<Child> {
        self.find_by_id(child_id)?
            .ok_or_else(|| RepositoryError::not_found("Child", child_id))
    }

    /// 更新儿童状态
    pub fn update_status(
        &self,
        child_id: &str,
        status: ChildStatus,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            "UPDATE child SET status = ?1, updated_at = ?2 WHERE child_id = ?3",
            params![status.as_str(), updated_at, child_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Child", child_id));
        }
        Ok(())
    }

    /// 覆盖档案事实
    pub fn update_profile(
        &self,
        child_id: &str,
        profile: &BTreeMap<String, FactValue>,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let profile_json = serde_json::to_string(profile)?;
        let affected = self.conn.execute(
            "UPDATE child SET profile_json = ?1, updated_at = ?2 WHERE child_id = ?3",
            params![profile_json, updated_at, child_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Child", child_id));
        }
        Ok(())
    }

    /// 覆盖志愿列表
    pub fn replace_preferences(
        &self,
        child_id: &str,
        preferences: &[DaycarePreference],
    ) -> RepositoryResult<()> {
        self.conn.execute(
            "DELETE FROM child_preference WHERE child_id = ?1",
            params![child_id],
        )?;
        self.insert_preferences(child_id, preferences)
    }

    fn insert_preferences(
        &self,
        child_id: &str,
        preferences: &[DaycarePreference],
    ) -> RepositoryResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO child_preference (child_id, rank, daycare_id) VALUES (?1, ?2, ?3)",
        )?;
        for pref in preferences {
            stmt.execute(params![child_id, pref.rank, pref.daycare_id])?;
        }
        Ok(())
    }

    fn find_preferences(&self, child_id: &str) -> RepositoryResult<Vec<DaycarePreference>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT rank, daycare_id
            FROM child_preference
            WHERE child_id = ?1
            ORDER BY rank
            "#,
        )?;
        let prefs = stmt
            .query_map(params![child_id], |row| {
                Ok(DaycarePreference {
                    rank: row.get(0)?,
                    daycare_id: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<DaycarePreference>>>()?;
        Ok(prefs)
    }
}

/// child 行映射 (志愿另查)
fn map_child_row(row: &rusqlite::Row<'_>) -> SqliteResult<Child> {
    Ok(Child {
        child_id: row.get(0)?,
        name: row.get(1)?,
        birth_date: row.get(2)?,
        status: parse_column(3, row.get::<_, String>(3)?)?,
        preferences: Vec::new(),
        profile: parse_json_column(4, row.get::<_, String>(4)?)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
