use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;

fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::ensure_schema(&conn).unwrap();
    conn
}

fn make_test_log(action_id: &str, action_type: ActionType, child_id: Option<&str>, minute: u32) -> ActionLog {
    ActionLog {
        action_id: action_id.to_string(),
        action_type,
        child_id: child_id.map(|s| s.to_string()),
        actor: "secretaria".to_string(),
        action_ts: NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap(),
        payload_json: Some(json!({ "score": 80 })),
        detail: Some("Test log".to_string()),
    }
}

#[test]
fn test_insert_and_find_by_child() {
    let conn = setup_test_db();
    let repo = ActionLogRepository::new(&conn);

    assert_eq!(
        repo.insert(&make_test_log("log1", ActionType::Enqueue, Some("C1"), 0)).unwrap(),
        "log1"
    );
    repo.insert(&make_test_log("log2", ActionType::Pause, Some("C1"), 5)).unwrap();
    repo.insert(&make_test_log("log3", ActionType::Enqueue, Some("C2"), 6)).unwrap();

    let logs = repo.find_by_child("C1").unwrap();
    assert_eq!(logs.len(), 2);
    // 时间倒序
    assert_eq!(logs[0].action_id, "log2");
    assert_eq!(logs[0].action_type, ActionType::Pause);
    assert_eq!(logs[1].payload_json, Some(json!({ "score": 80 })));
}

#[test]
fn test_find_by_type_and_recent() {
    let conn = setup_test_db();
    let repo = ActionLogRepository::new(&conn);

    let logs = vec![
        make_test_log("log1", ActionType::Reorder, None, 0),
        make_test_log("log2", ActionType::AllocationRun, None, 1),
        make_test_log("log3", ActionType::Reorder, None, 2),
    ];
    assert_eq!(repo.batch_insert(&logs).unwrap(), 3);

    assert_eq!(repo.find_by_type(ActionType::Reorder).unwrap().len(), 2);

    let recent = repo.find_recent(1).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].action_id, "log3");
}
