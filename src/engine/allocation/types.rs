use crate::config::AllocationDefaults;
use crate::domain::allocation::AllocationOptions;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// 本轮实际生效的参数 (选项与配置默认值合并后)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRunParams {
    pub limit: Option<usize>,
    pub recalculate_scores: bool,
    pub start_date: NaiveDate,
}

impl AllocationRunParams {
    /// 显式选项优先,其次配置默认值
    pub fn resolve(
        options: &AllocationOptions,
        defaults: &AllocationDefaults,
        today: NaiveDate,
    ) -> Self {
        let start_date = today
            .checked_add_days(Days::new(u64::from(defaults.start_offset_days)))
            .unwrap_or(today);

        Self {
            limit: options.limit.or(defaults.default_limit),
            recalculate_scores: options
                .recalculate_scores
                .unwrap_or(defaults.recalculate_scores),
            start_date,
        }
    }
}
