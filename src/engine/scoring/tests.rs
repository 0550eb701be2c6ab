use super::{CriterionOutcome, ScoringEngine};
use crate::domain::child::{Child, DaycarePreference, FactValue, AGE_MONTHS_FACT};
use crate::domain::criterion::{Comparator, Criterion, CriterionRule};
use crate::domain::types::ChildStatus;
use crate::engine::error::EngineError;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;

// ==========================================
// 测试辅助函数
// ==========================================

fn eval_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

fn create_child(facts: &[(&str, FactValue)]) -> Child {
    Child {
        child_id: "C001".to_string(),
        name: "Ana".to_string(),
        birth_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
        status: ChildStatus::Waiting,
        preferences: vec![DaycarePreference {
            rank: 1,
            daycare_id: "D1".to_string(),
        }],
        profile: facts
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn boolean(id: &str, weight: u32, fact: &str) -> Criterion {
    Criterion {
        criterion_id: id.to_string(),
        name: format!("标准{}", id),
        weight,
        active: true,
        rule: CriterionRule::Boolean {
            fact: fact.to_string(),
        },
    }
}

fn numeric(id: &str, weight: u32, fact: &str, op: Comparator, threshold: f64) -> Criterion {
    Criterion {
        criterion_id: id.to_string(),
        name: format!("标准{}", id),
        weight,
        active: true,
        rule: CriterionRule::Numeric {
            fact: fact.to_string(),
            op,
            threshold,
        },
    }
}

fn enumerated(id: &str, weight: u32, fact: &str, accepted: &[&str]) -> Criterion {
    Criterion {
        criterion_id: id.to_string(),
        name: format!("标准{}", id),
        weight,
        active: true,
        rule: CriterionRule::Enumerated {
            fact: fact.to_string(),
            accepted: accepted.iter().map(|s| s.to_string()).collect(),
        },
    }
}

// ==========================================
// 正常案例
// ==========================================

#[test]
fn test_total_is_sum_of_satisfied_weights() {
    let engine = ScoringEngine::new();
    let child = create_child(&[
        ("bolsa_familia", FactValue::Bool(true)),
        ("mother_works", FactValue::Bool(false)),
        ("household_income", FactValue::Number(1200.0)),
        ("residence_zone", FactValue::Text("rural".to_string())),
    ]);
    let criteria = vec![
        boolean("K1", 30, "bolsa_familia"),
        boolean("K2", 20, "mother_works"),
        numeric("K3", 25, "household_income", Comparator::Le, 1500.0),
        enumerated("K4", 10, "residence_zone", &["rural", "quilombola"]),
    ];

    let result = engine.score(&child, &criteria, eval_date()).unwrap();

    assert_eq!(result.total, 30 + 25 + 10);
    let ids: Vec<&str> = result.applied.iter().map(|a| a.criterion_id.as_str()).collect();
    assert_eq!(ids, vec!["K1", "K3", "K4"]);
    assert_eq!(
        result.applied.iter().map(|a| a.contribution).sum::<u32>(),
        result.total
    );
}

#[test]
fn test_inactive_criteria_never_contribute() {
    let engine = ScoringEngine::new();
    let child = create_child(&[("bolsa_familia", FactValue::Bool(true))]);

    let mut inactive = boolean("K1", 30, "bolsa_familia");
    inactive.active = false;
    // 停用标准即使缺少事实也不应报错
    let mut inactive_missing = boolean("K2", 40, "not_recorded");
    inactive_missing.active = false;

    let result = engine
        .score(&child, &[inactive, inactive_missing], eval_date())
        .unwrap();
    assert_eq!(result.total, 0);
    assert!(result.applied.is_empty());
}

#[test]
fn test_score_is_deterministic_regardless_of_input_order() {
    let engine = ScoringEngine::new();
    let child = create_child(&[
        ("a", FactValue::Bool(true)),
        ("b", FactValue::Bool(true)),
    ]);
    let forward = vec![boolean("K1", 5, "a"), boolean("K2", 7, "b")];
    let backward = vec![boolean("K2", 7, "b"), boolean("K1", 5, "a")];

    let first = engine.score(&child, &forward, eval_date()).unwrap();
    let second = engine.score(&child, &forward, eval_date()).unwrap();
    let reversed = engine.score(&child, &backward, eval_date()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, reversed);
}

#[test]
fn test_age_months_is_derived_at_evaluation_date() {
    let engine = ScoringEngine::new();
    // 出生 2024-09-01, 评估日 2026-03-01 → 18 个月
    let child = create_child(&[]);
    let criterion = numeric("K1", 15, AGE_MONTHS_FACT, Comparator::Lt, 24.0);

    assert_eq!(
        engine.evaluate(&child, &criterion, eval_date()).unwrap(),
        CriterionOutcome::Satisfied
    );
    assert_eq!(
        engine
            .evaluate(&child, &criterion, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap())
            .unwrap(),
        CriterionOutcome::NotSatisfied
    );
}

#[test]
fn test_not_satisfied_contributes_zero() {
    let engine = ScoringEngine::new();
    let child = create_child(&[("household_income", FactValue::Number(4000.0))]);
    let criteria = vec![numeric("K1", 25, "household_income", Comparator::Le, 1500.0)];

    let result = engine.score(&child, &criteria, eval_date()).unwrap();
    assert_eq!(result.total, 0);
}

// ==========================================
// 无法评估案例
// ==========================================

#[test]
fn test_missing_fact_is_invalid_child_state() {
    let engine = ScoringEngine::new();
    let child = create_child(&[]);
    let criteria = vec![numeric("K_INCOME", 25, "household_income", Comparator::Le, 1500.0)];

    match engine.score(&child, &criteria, eval_date()) {
        Err(EngineError::InvalidChildState {
            child_id,
            criterion_id,
            ..
        }) => {
            assert_eq!(child_id, "C001");
            assert_eq!(criterion_id, "K_INCOME");
        }
        other => panic!("预期 InvalidChildState, 实际 {:?}", other),
    }
}

#[test]
fn test_fact_type_mismatch_is_invalid_child_state() {
    let engine = ScoringEngine::new();
    let child = create_child(&[("bolsa_familia", FactValue::Text("sim".to_string()))]);

    let result = engine.evaluate(&child, &boolean("K1", 30, "bolsa_familia"), eval_date());
    assert!(matches!(result, Err(EngineError::InvalidChildState { .. })));
}

#[test]
fn test_non_finite_number_is_invalid_child_state() {
    let engine = ScoringEngine::new();
    let child = create_child(&[("household_income", FactValue::Number(f64::NAN))]);
    let criterion = numeric("K1", 25, "household_income", Comparator::Le, 1500.0);

    assert!(matches!(
        engine.evaluate(&child, &criterion, eval_date()),
        Err(EngineError::InvalidChildState { .. })
    ));
}
