// ==========================================
// 托育候补名单系统 - 优先级评分引擎
// ==========================================
// 职责: 儿童档案 + 启用的评分标准 → 总分 + 已生效标准快照
// 输入: 儿童、评分标准列表、评估日期
// 输出: ScoreResult
// ==========================================
// 红线: 纯计算,无副作用,不读取系统时间
// 红线: 停用标准永不计分
// 红线: "无法评估" 与 "不满足" 必须区分上报
// ==========================================

use crate::domain::child::{Child, FactValue};
use crate::domain::criterion::{AppliedCriterion, Criterion, CriterionRule};
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// 评分结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total: u32,
    pub applied: Vec<AppliedCriterion>,
}

/// 单条标准的判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionOutcome {
    Satisfied,
    NotSatisfied,
}

// ==========================================
// ScoringEngine - 优先级评分引擎
// ==========================================
#[derive(Debug, Default, Clone)]
pub struct ScoringEngine {
    // 无状态引擎,不需要注入依赖
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算儿童优先级分数
    ///
    /// 规则:
    /// 1) 仅启用标准参与 (传入的停用标准被跳过)
    /// 2) 满足的标准贡献其完整权重
    /// 3) 标准按 criterion_id 排序后评估,快照顺序稳定
    ///
    /// # 参数
    /// - `child`: 儿童
    /// - `criteria`: 评分标准
    /// - `evaluation_date`: 评估日期 (月龄等派生事实的基准)
    ///
    /// # 返回
    /// - Ok(ScoreResult)
    /// - Err(InvalidChildState): 任一启用标准无法评估
    pub fn score(
        &self,
        child: &Child,
        criteria: &[Criterion],
        evaluation_date: NaiveDate,
    ) -> EngineResult<ScoreResult> {
        let mut active: Vec<&Criterion> = criteria.iter().filter(|c| c.active).collect();
        active.sort_by(|a, b| a.criterion_id.cmp(&b.criterion_id));

        let mut total: u32 = 0;
        let mut applied = Vec::new();

        for criterion in active {
            if self.evaluate(child, criterion, evaluation_date)? == CriterionOutcome::Satisfied {
                total = total.saturating_add(criterion.weight);
                applied.push(AppliedCriterion {
                    criterion_id: criterion.criterion_id.clone(),
                    criterion_name: criterion.name.clone(),
                    contribution: criterion.weight,
                });
            }
        }

        tracing::debug!(
            child_id = %child.child_id,
            total,
            applied_count = applied.len(),
            "评分完成"
        );

        Ok(ScoreResult { total, applied })
    }

    /// 判定单条标准
    ///
    /// # 返回
    /// - Ok(Satisfied / NotSatisfied)
    /// - Err(InvalidChildState): 缺少事实,或事实类型与标准类型不符
    pub fn evaluate(
        &self,
        child: &Child,
        criterion: &Criterion,
        evaluation_date: NaiveDate,
    ) -> EngineResult<CriterionOutcome> {
        let fact_key = criterion.rule.fact_key();
        let fact = child.fact(fact_key, evaluation_date).ok_or_else(|| {
            invalid_state(child, criterion, format!("缺少档案事实: {}", fact_key))
        })?;

        let satisfied = match (&criterion.rule, &fact) {
            (CriterionRule::Boolean { .. }, FactValue::Bool(value)) => *value,
            (CriterionRule::Numeric { op, threshold, .. }, FactValue::Number(value)) => {
                if !value.is_finite() {
                    return Err(invalid_state(
                        child,
                        criterion,
                        format!("档案事实不是有限数值: {}={}", fact_key, value),
                    ));
                }
                op.compare(*value, *threshold)
            }
            (CriterionRule::Enumerated { accepted, .. }, FactValue::Text(value)) => {
                accepted.iter().any(|a| a == value)
            }
            (rule, fact) => {
                return Err(invalid_state(
                    child,
                    criterion,
                    format!(
                        "档案事实类型不匹配: fact={}, expected={}, actual={}",
                        fact_key,
                        rule.kind(),
                        fact.type_name()
                    ),
                ));
            }
        };

        Ok(if satisfied {
            CriterionOutcome::Satisfied
        } else {
            CriterionOutcome::NotSatisfied
        })
    }
}

fn invalid_state(child: &Child, criterion: &Criterion, reason: String) -> EngineError {
    EngineError::InvalidChildState {
        child_id: child.child_id.clone(),
        criterion_id: criterion.criterion_id.clone(),
        reason,
    }
}
