// ==========================================
// 托育候补名单系统 - 评分标准数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::criterion::Criterion;
use crate::repository::error::{parse_json_column, RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};

const SELECT_COLUMNS: &str = "SELECT criterion_id, name, weight, active, rule_json FROM criterion";

/// 评分标准仓储
pub struct CriterionRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CriterionRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 新增评分标准
    pub fn insert(&self, criterion: &Criterion) -> RepositoryResult<()> {
        let rule_json = serde_json::to_string(&criterion.rule)?;
        self.conn.execute(
            r#"
            INSERT INTO criterion (criterion_id, name, weight, active, kind, rule_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                criterion.criterion_id,
                criterion.name,
                criterion.weight,
                criterion.active,
                criterion.kind().as_str(),
                rule_json,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, criterion_id: &str) -> RepositoryResult<Option<Criterion>> {
        let sql = format!("{} WHERE criterion_id = ?1", SELECT_COLUMNS);
        let criterion = self
            .conn
            .query_row(&sql, params![criterion_id], map_criterion_row)
            .optional()?;
        Ok(criterion)
    }

    /// 查询全部启用的评分标准 (按ID排序,保证评分确定性)
    pub fn find_active(&self) -> RepositoryResult<Vec<Criterion>> {
        let sql = format!("{} WHERE active = 1 ORDER BY criterion_id", SELECT_COLUMNS);
        self.query_list(&sql)
    }

    pub fn find_all(&self) -> RepositoryResult<Vec<Criterion>> {
        let sql = format!("{} ORDER BY criterion_id", SELECT_COLUMNS);
        self.query_list(&sql)
    }

    /// 启用/停用评分标准
    pub fn set_active(&self, criterion_id: &str, active: bool) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            "UPDATE criterion SET active = ?1 WHERE criterion_id = ?2",
            params![active, criterion_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Criterion", criterion_id));
        }
        Ok(())
    }

    /// 调整权重
    pub fn update_weight(&self, criterion_id: &str, weight: u32) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            "UPDATE criterion SET weight = ?1 WHERE criterion_id = ?2",
            params![weight, criterion_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Criterion", criterion_id));
        }
        Ok(())
    }

    fn query_list(&self, sql: &str) -> RepositoryResult<Vec<Criterion>> {
        let mut stmt = self.conn.prepare(sql)?;
        let list = stmt
            .query_map([], map_criterion_row)?
            .collect::<SqliteResult<Vec<Criterion>>>()?;
        Ok(list)
    }
}

fn map_criterion_row(row: &rusqlite::Row<'_>) -> SqliteResult<Criterion> {
    Ok(Criterion {
        criterion_id: row.get(0)?,
        name: row.get(1)?,
        weight: row.get(2)?,
        active: row.get(3)?,
        rule: parse_json_column(4, row.get::<_, String>(4)?)?,
    })
}
