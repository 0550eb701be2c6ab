// ==========================================
// 托育候补名单系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 注意: 不可在引擎事务内部调用 (共享同一连接锁)
// ==========================================

use crate::domain::child::DEFAULT_MAX_PREFERENCES;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::SqliteStore;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// 配置键常量
pub mod config_keys {
    /// 单轮分配默认上限 (空 = 不限)
    pub const ALLOCATION_DEFAULT_LIMIT: &str = "allocation.default_limit";
    /// 分配前是否默认重算分数
    pub const ALLOCATION_RECALCULATE_SCORES: &str = "allocation.recalculate_scores";
    /// 入托开始日期相对今天的偏移天数
    pub const ALLOCATION_START_OFFSET_DAYS: &str = "allocation.start_offset_days";
    /// 每个儿童的志愿数量上限
    pub const WAITLIST_MAX_PREFERENCES: &str = "waitlist.max_preferences";
}

/// 配置作用域 (目前仅支持 global)
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// AllocationDefaults - 分配默认参数
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationDefaults {
    pub default_limit: Option<usize>,
    pub recalculate_scores: bool,
    pub start_offset_days: u32,
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Clone)]
pub struct ConfigManager {
    store: SqliteStore,
}

impl ConfigManager {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        self.store.read(|conn| read_value(conn, key))
    }

    /// 写入配置值 (UPSERT)
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        self.store.in_transaction(|tx| -> RepositoryResult<()> {
            tx.execute(
                r#"
                INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
                ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')
                "#,
                params![GLOBAL_SCOPE, key, value],
            )?;
            Ok(())
        })
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// 用途: 分配轮次的操作日志中记录当时生效的配置
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        self.store.read(|conn| -> RepositoryResult<String> {
            let mut stmt = conn
                .prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
            let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut config_map: BTreeMap<String, String> = BTreeMap::new();
            for row in rows {
                let (key, value) = row?;
                config_map.insert(key, value);
            }

            Ok(serde_json::to_string(&json!(config_map))?)
        })
    }

    // ===== 分配配置 =====

    /// 读取分配默认参数 (缺省或空值使用默认值)
    pub fn get_allocation_defaults(&self) -> RepositoryResult<AllocationDefaults> {
        let defaults = AllocationDefaults::default();

        let default_limit = match self.get_config_value(config_keys::ALLOCATION_DEFAULT_LIMIT)? {
            Some(raw) if !raw.trim().is_empty() => {
                Some(parse_value::<usize>(config_keys::ALLOCATION_DEFAULT_LIMIT, &raw)?)
            }
            _ => defaults.default_limit,
        };

        let recalculate_scores =
            match self.get_config_value(config_keys::ALLOCATION_RECALCULATE_SCORES)? {
                Some(raw) => parse_bool(config_keys::ALLOCATION_RECALCULATE_SCORES, &raw)?,
                None => defaults.recalculate_scores,
            };

        let start_offset_days =
            match self.get_config_value(config_keys::ALLOCATION_START_OFFSET_DAYS)? {
                Some(raw) => parse_value::<u32>(config_keys::ALLOCATION_START_OFFSET_DAYS, &raw)?,
                None => defaults.start_offset_days,
            };

        Ok(AllocationDefaults {
            default_limit,
            recalculate_scores,
            start_offset_days,
        })
    }

    // ===== 候补配置 =====

    /// 志愿数量上限 (限定在 1..=DEFAULT_MAX_PREFERENCES)
    pub fn get_max_preferences(&self) -> RepositoryResult<usize> {
        match self.get_config_value(config_keys::WAITLIST_MAX_PREFERENCES)? {
            Some(raw) => {
                let max = parse_value::<usize>(config_keys::WAITLIST_MAX_PREFERENCES, &raw)?;
                let clamped = max.clamp(1, DEFAULT_MAX_PREFERENCES);
                if clamped != max {
                    tracing::warn!(
                        "{}={} 超出范围, 按 {} 处理",
                        config_keys::WAITLIST_MAX_PREFERENCES,
                        max,
                        clamped
                    );
                }
                Ok(clamped)
            }
            None => Ok(DEFAULT_MAX_PREFERENCES),
        }
    }
}

fn read_value(conn: &Connection, key: &str) -> RepositoryResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> RepositoryResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| RepositoryError::FieldValueError {
            field: key.to_string(),
            message: format!("{} (value={})", e, raw),
        })
}

fn parse_bool(key: &str, raw: &str) -> RepositoryResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(RepositoryError::FieldValueError {
            field: key.to_string(),
            message: format!("无法解析为布尔值: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        ConfigManager::new(SqliteStore::open_in_memory().unwrap())
    }

    #[test]
    fn test_allocation_defaults_when_empty() {
        let config = manager();
        assert_eq!(
            config.get_allocation_defaults().unwrap(),
            AllocationDefaults::default()
        );
        assert_eq!(config.get_max_preferences().unwrap(), DEFAULT_MAX_PREFERENCES);
    }

    #[test]
    fn test_allocation_defaults_from_config_kv() {
        let config = manager();
        config
            .set_config_value(config_keys::ALLOCATION_DEFAULT_LIMIT, "25")
            .unwrap();
        config
            .set_config_value(config_keys::ALLOCATION_RECALCULATE_SCORES, "true")
            .unwrap();
        config
            .set_config_value(config_keys::ALLOCATION_START_OFFSET_DAYS, "7")
            .unwrap();

        let defaults = config.get_allocation_defaults().unwrap();
        assert_eq!(defaults.default_limit, Some(25));
        assert!(defaults.recalculate_scores);
        assert_eq!(defaults.start_offset_days, 7);

        // 覆写
        config
            .set_config_value(config_keys::ALLOCATION_DEFAULT_LIMIT, "")
            .unwrap();
        assert_eq!(config.get_allocation_defaults().unwrap().default_limit, None);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let config = manager();
        config
            .set_config_value(config_keys::WAITLIST_MAX_PREFERENCES, "três")
            .unwrap();
        assert!(matches!(
            config.get_max_preferences(),
            Err(RepositoryError::FieldValueError { .. })
        ));
    }

    #[test]
    fn test_max_preferences_is_clamped() {
        let config = manager();
        config
            .set_config_value(config_keys::WAITLIST_MAX_PREFERENCES, "5")
            .unwrap();
        assert_eq!(config.get_max_preferences().unwrap(), DEFAULT_MAX_PREFERENCES);

        config
            .set_config_value(config_keys::WAITLIST_MAX_PREFERENCES, "0")
            .unwrap();
        assert_eq!(config.get_max_preferences().unwrap(), 1);

        config
            .set_config_value(config_keys::WAITLIST_MAX_PREFERENCES, "2")
            .unwrap();
        assert_eq!(config.get_max_preferences().unwrap(), 2);
    }

    #[test]
    fn test_config_snapshot() {
        let config = manager();
        config
            .set_config_value(config_keys::ALLOCATION_DEFAULT_LIMIT, "10")
            .unwrap();

        let snapshot: BTreeMap<String, String> =
            serde_json::from_str(&config.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(
            snapshot.get(config_keys::ALLOCATION_DEFAULT_LIMIT),
            Some(&"10".to_string())
        );
    }
}
