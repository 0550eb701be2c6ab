// ==========================================
// 托育候补名单系统 - 评分标准领域模型
// ==========================================
// 评分标准由管理员维护,与儿童无关
// 贡献分 = 满足时取 weight,不满足取 0
// ==========================================

use crate::domain::types::CriterionKind;
use serde::{Deserialize, Serialize};

// ==========================================
// Comparator - 数值比较运算符
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparator {
    /// 执行比较 `value <op> threshold`
    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::Lt => value < threshold,
            Comparator::Le => value <= threshold,
            Comparator::Gt => value > threshold,
            Comparator::Ge => value >= threshold,
            Comparator::Eq => (value - threshold).abs() < f64::EPSILON,
        }
    }
}

// ==========================================
// CriterionRule - 标准判定规则
// ==========================================
// 每条规则绑定一个档案事实键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CriterionRule {
    /// 布尔事实为 true 时满足
    Boolean { fact: String },
    /// 数值事实满足比较时满足
    Numeric {
        fact: String,
        op: Comparator,
        threshold: f64,
    },
    /// 文本事实属于候选集合时满足
    Enumerated { fact: String, accepted: Vec<String> },
}

impl CriterionRule {
    pub fn kind(&self) -> CriterionKind {
        match self {
            CriterionRule::Boolean { .. } => CriterionKind::Boolean,
            CriterionRule::Numeric { .. } => CriterionKind::Numeric,
            CriterionRule::Enumerated { .. } => CriterionKind::Enumerated,
        }
    }

    /// 规则依赖的事实键
    pub fn fact_key(&self) -> &str {
        match self {
            CriterionRule::Boolean { fact }
            | CriterionRule::Numeric { fact, .. }
            | CriterionRule::Enumerated { fact, .. } => fact,
        }
    }
}

// ==========================================
// Criterion - 评分标准
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub criterion_id: String,
    pub name: String,
    pub weight: u32,     // 权重 (正整数)
    pub active: bool,    // 是否启用
    pub rule: CriterionRule,
}

impl Criterion {
    pub fn kind(&self) -> CriterionKind {
        self.rule.kind()
    }
}

// ==========================================
// AppliedCriterion - 已生效标准快照
// ==========================================
// 仅用于审计展示,不用于重算
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCriterion {
    pub criterion_id: String,
    pub criterion_name: String,
    pub contribution: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparator() {
        assert!(Comparator::Lt.compare(1.0, 2.0));
        assert!(!Comparator::Lt.compare(2.0, 2.0));
        assert!(Comparator::Le.compare(2.0, 2.0));
        assert!(Comparator::Gt.compare(3.0, 2.0));
        assert!(Comparator::Ge.compare(2.0, 2.0));
        assert!(Comparator::Eq.compare(2.0, 2.0));
    }

    #[test]
    fn test_rule_json_shape() {
        let rule = CriterionRule::Numeric {
            fact: "household_income".to_string(),
            op: Comparator::Le,
            threshold: 1500.0,
        };
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"kind\":\"numeric\""));

        let back: CriterionRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
        assert_eq!(back.kind(), CriterionKind::Numeric);
        assert_eq!(back.fact_key(), "household_income");
    }
}
