// ==========================================
// Repository 集成测试
// ==========================================
// 职责: 验证仓储读写、唯一约束兜底、跨仓储事务
// ==========================================


#[cfg(test)]
mod repository_integration_test {
    use chrono::NaiveDate;
    use daycare_waitlist::domain::{
        Allocation, AllocationStatus, AppliedCriterion, ChildStatus, FactValue, WaitlistEntry,
        WaitlistStatus, PLACEHOLDER_POSITION,
    };
    use daycare_waitlist::repository::{
        AllocationRepository, ChildRepository, DaycareRepository, RepositoryError,
        RepositoryResult, SqliteStore, WaitlistRepository,
    };

    use crate::test_helpers::*;

    fn setup_store() -> (tempfile::NamedTempFile, SqliteStore) {
        let (temp_file, db_path) = create_test_db().unwrap();
        let store = SqliteStore::open(&db_path).unwrap();
        store
            .in_transaction(|tx| -> RepositoryResult<()> {
                let repo = DaycareRepository::new(tx);
                repo.insert_daycare(&create_daycare("D1"))?;
                repo.insert_group(&create_group("G1", "D1", 0, 3, 2))?;
                ChildRepository::new(tx).insert(&create_child(
                    "C1",
                    &["D1"],
                    &[("income", FactValue::Number(1200.5))],
                ))
            })
            .unwrap();
        (temp_file, store)
    }

    fn entry(id: &str, status: WaitlistStatus) -> WaitlistEntry {
        WaitlistEntry {
            entry_id: id.to_string(),
            child_id: "C1".to_string(),
            total_score: 30,
            applied_criteria: vec![AppliedCriterion {
                criterion_id: "K1".to_string(),
                criterion_name: "Renda".to_string(),
                contribution: 30,
            }],
            position: PLACEHOLDER_POSITION,
            enrollment_date: base_time().naive_utc(),
            status,
            updated_at: base_time(),
        }
    }

    #[test]
    fn test_child_round_trip_keeps_profile_and_preferences() {
        let (_temp, store) = setup_store();
        let child = store
            .read(|conn| ChildRepository::new(conn).get("C1"))
            .unwrap();

        assert_eq!(child.status, ChildStatus::Waiting);
        assert_eq!(child.preferences.len(), 1);
        assert_eq!(child.preferences[0].daycare_id, "D1");
        assert_eq!(child.profile.get("income"), Some(&FactValue::Number(1200.5)));
    }

    #[test]
    fn test_applied_criteria_snapshot_round_trips() {
        let (_temp, store) = setup_store();
        store
            .in_transaction(|tx| WaitlistRepository::new(tx).insert(&entry("E1", WaitlistStatus::Waiting)))
            .unwrap();

        let loaded = store
            .read(|conn| WaitlistRepository::new(conn).find_active_by_child("C1"))
            .unwrap()
            .unwrap();
        assert_eq!(loaded.applied_criteria, entry("E1", WaitlistStatus::Waiting).applied_criteria);
        assert_eq!(loaded.enrollment_date, base_time().naive_utc());
    }

    #[test]
    fn test_second_active_entry_violates_unique_index() {
        let (_temp, store) = setup_store();
        store
            .in_transaction(|tx| WaitlistRepository::new(tx).insert(&entry("E1", WaitlistStatus::Paused)))
            .unwrap();

        let err = store
            .in_transaction(|tx| WaitlistRepository::new(tx).insert(&entry("E2", WaitlistStatus::Waiting)))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

        // 终态条目不受限制
        store
            .in_transaction(|tx| WaitlistRepository::new(tx).insert(&entry("E3", WaitlistStatus::Removed)))
            .unwrap();
    }

    #[test]
    fn test_failed_transaction_rolls_back_every_repository() {
        let (_temp, store) = setup_store();

        let result = store.in_transaction(|tx| -> RepositoryResult<()> {
            WaitlistRepository::new(tx).insert(&entry("E1", WaitlistStatus::Waiting))?;
            AllocationRepository::new(tx).insert(&Allocation {
                allocation_id: "A1".to_string(),
                child_id: "C1".to_string(),
                daycare_id: "D1".to_string(),
                group_id: "G1".to_string(),
                start_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                end_date: None,
                status: AllocationStatus::Active,
                created_at: base_time(),
            })?;
            ChildRepository::new(tx).update_status("NOPE", ChildStatus::Enrolled, base_time())
        });
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));

        let entries = store
            .read(|conn| WaitlistRepository::new(conn).find_by_child("C1"))
            .unwrap();
        assert!(entries.is_empty());
        let occupied = store
            .read(|conn| AllocationRepository::new(conn).count_active_by_group("G1"))
            .unwrap();
        assert_eq!(occupied, 0);
    }
}
