// ==========================================
// 托育候补名单系统 - 名额分配领域模型
// ==========================================
// 红线: 每个儿童至多一个 ACTIVE 分配
// ==========================================

use crate::domain::types::AllocationStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Allocation - 名额分配
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub allocation_id: String,
    pub child_id: String,
    pub daycare_id: String,
    pub group_id: String, // 实际入托班组 (占用计数依据)
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: AllocationStatus,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// 匹配轮次的输入/输出
// ==========================================

/// 分配选项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationOptions {
    /// 本轮最多分配数 (None = 使用配置默认值)
    pub limit: Option<usize>,
    /// 是否先重算全部候补儿童的分数 (None = 使用配置默认值)
    pub recalculate_scores: Option<bool>,
    /// 仅考虑这些机构 (None = 全部)
    pub restrict_to_daycares: Option<Vec<String>>,
}

impl AllocationOptions {
    /// 机构是否在本轮考虑范围内
    pub fn allows_daycare(&self, daycare_id: &str) -> bool {
        match &self.restrict_to_daycares {
            Some(ids) => ids.iter().any(|id| id == daycare_id),
            None => true,
        }
    }
}

/// 单条分配明细
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationDetail {
    pub child_id: String,
    pub daycare_id: String,
    pub group_id: String,
    pub preference_rank: u8,
}

/// 匹配轮次结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationRunResult {
    pub allocations_made: usize,
    pub details: Vec<AllocationDetail>,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_daycare() {
        let open = AllocationOptions::default();
        assert!(open.allows_daycare("D1"));

        let restricted = AllocationOptions {
            restrict_to_daycares: Some(vec!["D2".to_string()]),
            ..Default::default()
        };
        assert!(!restricted.allows_daycare("D1"));
        assert!(restricted.allows_daycare("D2"));
    }
}
