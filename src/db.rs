// ==========================================
// 托育候补名单系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键、busy_timeout)
// - 统一建表脚本,测试与 CLI 共用同一份 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "DAYCARE_WAITLIST_DB_PATH";

/// 建表脚本 (幂等)
///
/// 说明:
/// - 活跃候补条目、ACTIVE 分配均以部分唯一索引兜底 "每个儿童至多一条"
/// - position 不加唯一约束: 全量重排逐行写入,中间态允许重复
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS daycare (
    daycare_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS class_group (
    group_id TEXT PRIMARY KEY,
    daycare_id TEXT NOT NULL REFERENCES daycare(daycare_id),
    name TEXT NOT NULL,
    min_age_years INTEGER NOT NULL,
    max_age_years INTEGER NOT NULL,
    shift TEXT NOT NULL,
    capacity INTEGER NOT NULL CHECK (capacity >= 0),
    active INTEGER NOT NULL DEFAULT 1,
    CHECK (min_age_years <= max_age_years)
);

CREATE TABLE IF NOT EXISTS child (
    child_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    birth_date TEXT NOT NULL,
    status TEXT NOT NULL,
    profile_json TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS child_preference (
    child_id TEXT NOT NULL REFERENCES child(child_id),
    rank INTEGER NOT NULL CHECK (rank BETWEEN 1 AND 9),
    daycare_id TEXT NOT NULL REFERENCES daycare(daycare_id),
    PRIMARY KEY (child_id, rank),
    UNIQUE (child_id, daycare_id)
);

CREATE TABLE IF NOT EXISTS criterion (
    criterion_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    weight INTEGER NOT NULL CHECK (weight > 0),
    active INTEGER NOT NULL DEFAULT 1,
    kind TEXT NOT NULL,
    rule_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS waitlist_entry (
    entry_id TEXT PRIMARY KEY,
    child_id TEXT NOT NULL REFERENCES child(child_id),
    total_score INTEGER NOT NULL,
    applied_json TEXT NOT NULL DEFAULT '[]',
    position INTEGER NOT NULL DEFAULT 0,
    enrollment_date TEXT NOT NULL,
    status TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS ux_waitlist_active_child
    ON waitlist_entry(child_id) WHERE status IN ('WAITING', 'PAUSED');

CREATE INDEX IF NOT EXISTS ix_waitlist_status_position
    ON waitlist_entry(status, position);

CREATE TABLE IF NOT EXISTS allocation (
    allocation_id TEXT PRIMARY KEY,
    child_id TEXT NOT NULL REFERENCES child(child_id),
    daycare_id TEXT NOT NULL REFERENCES daycare(daycare_id),
    group_id TEXT NOT NULL REFERENCES class_group(group_id),
    start_date TEXT NOT NULL,
    end_date TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS ux_allocation_active_child
    ON allocation(child_id) WHERE status = 'ACTIVE';

CREATE INDEX IF NOT EXISTS ix_allocation_group_status
    ON allocation(group_id, status);

CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    action_type TEXT NOT NULL,
    child_id TEXT,
    actor TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    payload_json TEXT,
    detail TEXT
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表并登记 schema_version（幂等）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./daycare_waitlist.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("daycare-waitlist");
        // best-effort: 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("daycare_waitlist.db");
        }
    }

    path.to_string_lossy().to_string()
}
