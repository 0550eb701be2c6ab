// ==========================================
// 托育候补名单系统 - 托育机构/班组数据仓储
// ==========================================
// 红线: 只存静态容量,不存占用计数
// ==========================================

use crate::domain::daycare::{ClassGroup, Daycare};
use crate::repository::error::{parse_column, RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};

/// 托育机构仓储 (机构 + 班组目录)
pub struct DaycareRepository<'a> {
    conn: &'a Connection,
}

impl<'a> DaycareRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ===== 机构 =====

    pub fn insert_daycare(&self, daycare: &Daycare) -> RepositoryResult<()> {
        self.conn.execute(
            "INSERT INTO daycare (daycare_id, name, active) VALUES (?1, ?2, ?3)",
            params![daycare.daycare_id, daycare.name, daycare.active],
        )?;
        Ok(())
    }

    pub fn find_daycare(&self, daycare_id: &str) -> RepositoryResult<Option<Daycare>> {
        let daycare = self
            .conn
            .query_row(
                "SELECT daycare_id, name, active FROM daycare WHERE daycare_id = ?1",
                params![daycare_id],
                |row| {
                    Ok(Daycare {
                        daycare_id: row.get(0)?,
                        name: row.get(1)?,
                        active: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(daycare)
    }

    pub fn set_daycare_active(&self, daycare_id: &str, active: bool) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            "UPDATE daycare SET active = ?1 WHERE daycare_id = ?2",
            params![active, daycare_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Daycare", daycare_id));
        }
        Ok(())
    }

    // ===== 班组 =====

    pub fn insert_group(&self, group: &ClassGroup) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO class_group (
                group_id, daycare_id, name, min_age_years, max_age_years,
                shift, capacity, active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                group.group_id,
                group.daycare_id,
                group.name,
                group.min_age_years,
                group.max_age_years,
                group.shift.as_str(),
                group.capacity,
                group.active,
            ],
        )?;
        Ok(())
    }

    /// 查询机构下全部班组 (含停用)
    ///
    /// 排序: min_age_years, group_id (分配时按此顺序挑选班组)
    pub fn find_groups_by_daycare(&self, daycare_id: &str) -> RepositoryResult<Vec<ClassGroup>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT group_id, daycare_id, name, min_age_years, max_age_years,
                   shift, capacity, active
            FROM class_group
            WHERE daycare_id = ?1
            ORDER BY min_age_years, group_id
            "#,
        )?;
        let groups = stmt
            .query_map(params![daycare_id], |row| {
                Ok(ClassGroup {
                    group_id: row.get(0)?,
                    daycare_id: row.get(1)?,
                    name: row.get(2)?,
                    min_age_years: row.get(3)?,
                    max_age_years: row.get(4)?,
                    shift: parse_column(5, row.get::<_, String>(5)?)?,
                    capacity: row.get(6)?,
                    active: row.get(7)?,
                })
            })?
            .collect::<SqliteResult<Vec<ClassGroup>>>()?;
        Ok(groups)
    }

    pub fn update_group_capacity(&self, group_id: &str, capacity: u32) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            "UPDATE class_group SET capacity = ?1 WHERE group_id = ?2",
            params![capacity, group_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("ClassGroup", group_id));
        }
        Ok(())
    }

    pub fn set_group_active(&self, group_id: &str, active: bool) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            "UPDATE class_group SET active = ?1 WHERE group_id = ?2",
            params![active, group_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("ClassGroup", group_id));
        }
        Ok(())
    }
}
