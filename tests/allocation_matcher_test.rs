// ==========================================
// 名额匹配集成测试
// ==========================================
// 职责: 验证上限、容量、志愿顺序、争抢与幂等
// ==========================================


#[cfg(test)]
mod allocation_matcher_test {
    use chrono::{Duration, NaiveDate};
    use daycare_waitlist::config::config_keys;
    use daycare_waitlist::domain::{
        AllocationOptions, AllocationStatus, ChildStatus, WaitlistStatus,
    };
    use daycare_waitlist::repository::{AllocationRepository, WaitlistRepository};

    use crate::test_helpers::*;

    /// 单个布尔标准 priority=100
    fn setup() -> TestEnv {
        let env = setup_env();
        env.api
            .add_criterion(&bool_criterion("P", 100, "priority"))
            .unwrap();
        env
    }

    fn register(env: &TestEnv, id: &str, priority: bool, preferences: &[&str]) {
        env.clock.advance(Duration::minutes(1));
        env.api
            .register_child(
                &create_child(id, preferences, &[("priority", flag(priority))]),
                ACTOR,
            )
            .unwrap();
    }

    fn unlimited() -> AllocationOptions {
        AllocationOptions::default()
    }

    // ==========================================
    // 上限与容量
    // ==========================================

    #[test]
    fn test_limit_caps_allocations() {
        let env = setup();
        seed_daycare(&env.api, "D1", 10);
        for id in ["C1", "C2", "C3", "C4", "C5"] {
            register(&env, id, false, &["D1"]);
        }

        let result = env
            .api
            .run_allocation(
                &AllocationOptions {
                    limit: Some(2),
                    ..Default::default()
                },
                ACTOR,
            )
            .unwrap();

        assert_eq!(result.allocations_made, 2);
        assert_eq!(result.details.len(), 2);
        // 按排名顺序分配
        assert_eq!(result.details[0].child_id, "C1");
        assert_eq!(result.details[1].child_id, "C2");
        assert_eq!(env.api.list_waitlist().unwrap().len(), 3);
    }

    #[test]
    fn test_zero_limit_allocates_nothing() {
        let env = setup();
        seed_daycare(&env.api, "D1", 10);
        register(&env, "C1", true, &["D1"]);

        let result = env
            .api
            .run_allocation(
                &AllocationOptions {
                    limit: Some(0),
                    ..Default::default()
                },
                ACTOR,
            )
            .unwrap();

        assert_eq!(result.allocations_made, 0);
        assert!(result.errors.is_empty());
        assert_eq!(env.api.list_waitlist().unwrap().len(), 1);
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let env = setup();
        seed_daycare(&env.api, "D1", 2);
        for id in ["C1", "C2", "C3", "C4", "C5"] {
            register(&env, id, false, &["D1"]);
        }

        let result = env.api.run_allocation(&unlimited(), ACTOR).unwrap();
        assert_eq!(result.allocations_made, 2);
        assert_eq!(result.errors.len(), 3);
        assert_eq!(env.api.available_capacity("D1", 1).unwrap(), 0);

        let active = env
            .store
            .read(|conn| AllocationRepository::new(conn).count_active_by_group("D1-G1"))
            .unwrap();
        assert_eq!(active, 2);
    }

    #[test]
    fn test_second_run_without_changes_allocates_nothing() {
        let env = setup();
        seed_daycare(&env.api, "D1", 1);
        register(&env, "C1", true, &["D1"]);
        register(&env, "C2", false, &["D1"]);

        let first = env.api.run_allocation(&unlimited(), ACTOR).unwrap();
        assert_eq!(first.allocations_made, 1);
        let queue_after_first = env.api.list_waitlist().unwrap();

        let second = env.api.run_allocation(&unlimited(), ACTOR).unwrap();
        assert_eq!(second.allocations_made, 0);
        assert!(second.details.is_empty());

        let queue_after_second = env.api.list_waitlist().unwrap();
        assert_eq!(queue_after_first.len(), queue_after_second.len());
        assert_eq!(queue_after_second[0].child_id, "C2");
        assert_eq!(queue_after_second[0].position, 1);
    }

    // ==========================================
    // 志愿顺序
    // ==========================================

    #[test]
    fn test_first_preference_with_capacity_wins() {
        let env = setup();
        seed_daycare(&env.api, "D1", 1);
        seed_daycare(&env.api, "D2", 1);
        register(&env, "C1", true, &["D2", "D1"]);

        let result = env.api.run_allocation(&unlimited(), ACTOR).unwrap();
        assert_eq!(result.details[0].daycare_id, "D2");
        assert_eq!(result.details[0].preference_rank, 1);
    }

    #[test]
    fn test_contention_for_single_slot() {
        let env = setup();
        seed_daycare(&env.api, "D1", 1);
        seed_daycare(&env.api, "D2", 1);
        // 低分儿童先登记,高分儿童后登记
        register(&env, "LOW", false, &["D1", "D2"]);
        register(&env, "HIGH", true, &["D1"]);
        register(&env, "ONLY_D1", false, &["D1"]);

        let result = env.api.run_allocation(&unlimited(), ACTOR).unwrap();

        assert_eq!(result.allocations_made, 2);
        assert_eq!(result.details[0].child_id, "HIGH");
        assert_eq!(result.details[0].daycare_id, "D1");
        // 第一志愿已满,落到第二志愿
        assert_eq!(result.details[1].child_id, "LOW");
        assert_eq!(result.details[1].daycare_id, "D2");
        assert_eq!(result.details[1].preference_rank, 2);

        // 无可用志愿的儿童留在候补,并给出诊断
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("ONLY_D1"));
        let entry = env.api.get_entry("ONLY_D1").unwrap().unwrap();
        assert_eq!(entry.status, WaitlistStatus::Waiting);
        assert_eq!(entry.position, 1);
    }

    #[test]
    fn test_restrict_to_daycares_skips_other_preferences() {
        let env = setup();
        seed_daycare(&env.api, "D1", 5);
        seed_daycare(&env.api, "D2", 5);
        register(&env, "C1", true, &["D1", "D2"]);

        let result = env
            .api
            .run_allocation(
                &AllocationOptions {
                    restrict_to_daycares: Some(vec!["D2".to_string()]),
                    ..Default::default()
                },
                ACTOR,
            )
            .unwrap();

        assert_eq!(result.allocations_made, 1);
        assert_eq!(result.details[0].daycare_id, "D2");
        assert_eq!(result.details[0].preference_rank, 2);
    }

    #[test]
    fn test_age_outside_groups_is_not_placed() {
        let env = setup();
        env.api.add_daycare(&create_daycare("D1")).unwrap();
        env.api
            .add_group(&create_group("BERCARIO", "D1", 0, 1, 5))
            .unwrap();
        env.clock.advance(Duration::minutes(1));
        env.api
            .register_child(
                &create_child_born(
                    "C3",
                    NaiveDate::from_ymd_opt(2022, 12, 1).unwrap(),
                    &["D1"],
                    &[("priority", flag(true))],
                ),
                ACTOR,
            )
            .unwrap();

        let result = env.api.run_allocation(&unlimited(), ACTOR).unwrap();
        assert_eq!(result.allocations_made, 0);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(env.api.available_capacity("D1", 3).unwrap(), 0);
        assert_eq!(env.api.available_capacity("D1", 1).unwrap(), 5);
    }

    // ==========================================
    // 状态与配置
    // ==========================================

    #[test]
    fn test_allocation_updates_child_and_entry() {
        let env = setup();
        seed_daycare(&env.api, "D1", 1);
        register(&env, "C1", true, &["D1"]);

        env.api.run_allocation(&unlimited(), ACTOR).unwrap();

        assert_eq!(env.api.get_child("C1").unwrap().status, ChildStatus::Enrolled);
        assert!(env.api.get_entry("C1").unwrap().is_none());

        let entries = env
            .store
            .read(|conn| WaitlistRepository::new(conn).find_by_child("C1"))
            .unwrap();
        assert_eq!(entries[0].status, WaitlistStatus::Allocated);
        assert_eq!(entries[0].position, 0);

        let allocation = env
            .store
            .read(|conn| AllocationRepository::new(conn).find_active_by_child("C1"))
            .unwrap()
            .unwrap();
        assert_eq!(allocation.status, AllocationStatus::Active);
        assert_eq!(allocation.group_id, "D1-G1");
        assert_eq!(allocation.start_date, base_time().date_naive());
    }

    #[test]
    fn test_config_defaults_apply_when_options_are_empty() {
        let env = setup();
        seed_daycare(&env.api, "D1", 10);
        for id in ["C1", "C2", "C3"] {
            register(&env, id, false, &["D1"]);
        }
        env.api
            .config()
            .set_config_value(config_keys::ALLOCATION_DEFAULT_LIMIT, "1")
            .unwrap();
        env.api
            .config()
            .set_config_value(config_keys::ALLOCATION_START_OFFSET_DAYS, "7")
            .unwrap();

        let result = env.api.run_allocation(&unlimited(), ACTOR).unwrap();
        assert_eq!(result.allocations_made, 1);

        let allocation = env
            .store
            .read(|conn| AllocationRepository::new(conn).find_active_by_child("C1"))
            .unwrap()
            .unwrap();
        assert_eq!(
            allocation.start_date,
            base_time().date_naive() + Duration::days(7)
        );

        // 尚未开始的分配在退出时视为取消
        env.api.withdraw("C1", ACTOR).unwrap();
        let closed = env
            .store
            .read(|conn| AllocationRepository::new(conn).find_by_child("C1"))
            .unwrap();
        assert_eq!(closed[0].status, AllocationStatus::Cancelled);
    }

    #[test]
    fn test_recalculation_picks_up_criterion_changes() {
        let env = setup();
        seed_daycare(&env.api, "D1", 1);
        env.api
            .add_criterion(&bool_criterion("Q", 500, "sibling"))
            .unwrap();
        env.clock.advance(Duration::minutes(1));
        env.api
            .register_child(
                &create_child("C1", &["D1"], &[("priority", flag(true)), ("sibling", flag(false))]),
                ACTOR,
            )
            .unwrap();
        env.clock.advance(Duration::minutes(1));
        env.api
            .register_child(
                &create_child("C2", &["D1"], &[("priority", flag(false)), ("sibling", flag(true))]),
                ACTOR,
            )
            .unwrap();
        // C2=500 领先; 停用 Q 后只有重算才能反映
        env.api.set_criterion_active("Q", false).unwrap();

        let result = env
            .api
            .run_allocation(
                &AllocationOptions {
                    recalculate_scores: Some(true),
                    ..Default::default()
                },
                ACTOR,
            )
            .unwrap();

        assert_eq!(result.allocations_made, 1);
        assert_eq!(result.details[0].child_id, "C1");
        let remaining = env.api.get_entry("C2").unwrap().unwrap();
        assert_eq!(remaining.total_score, 0);
    }
}
