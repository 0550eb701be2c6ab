// ==========================================
// 托育候补名单系统 - 事务工作单元
// ==========================================
// 职责: 持有共享连接,为每个逻辑操作提供一个原子事务
// 并发: 连接 Mutex 串行化进程内所有操作;
//       BEGIN IMMEDIATE 在事务开始即取得写锁,串行化跨进程写入
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// SqliteStore - 共享存储
// ==========================================
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// 打开数据库文件并确保 schema 存在
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 打开内存数据库 (测试/演示用)
    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        crate::db::configure_sqlite_connection(&conn)?;
        ensure_schema(&conn)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 只读访问 (不开事务)
    pub fn read<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepositoryError>,
    {
        let conn = self.get_conn()?;
        f(&conn)
    }

    /// 在单个原子事务中执行 `f`
    ///
    /// # 语义
    /// - `f` 返回 Ok: 提交
    /// - `f` 返回 Err 或 panic: 事务随 drop 回滚,调用方只收到一个错误
    pub fn in_transaction<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RepositoryError>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let value = f(&tx)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_transaction_rolls_back() {
        let store = SqliteStore::open_in_memory().unwrap();

        let result: RepositoryResult<()> = store.in_transaction(|tx| {
            tx.execute(
                "INSERT INTO daycare (daycare_id, name, active) VALUES ('D1', 'CMEI A', 1)",
                [],
            )?;
            Err(RepositoryError::DatabaseQueryError("boom".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = store
            .read(|conn| -> RepositoryResult<i64> {
                Ok(conn.query_row("SELECT COUNT(*) FROM daycare", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_successful_transaction_commits() {
        let store = SqliteStore::open_in_memory().unwrap();

        store
            .in_transaction(|tx| -> RepositoryResult<()> {
                tx.execute(
                    "INSERT INTO daycare (daycare_id, name, active) VALUES ('D1', 'CMEI A', 1)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        let count: i64 = store
            .read(|conn| -> RepositoryResult<i64> {
                Ok(conn.query_row("SELECT COUNT(*) FROM daycare", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }
}
