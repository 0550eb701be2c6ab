// ==========================================
// 托育候补名单系统 - 儿童领域模型
// ==========================================
// 红线: 年龄只能由出生日期推导,不信任任何存储的年龄值
// 红线: 儿童不做物理删除 (status = WITHDRAWN)
// ==========================================

use crate::domain::types::ChildStatus;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// 保留的派生事实键: 评估日时的月龄
pub const AGE_MONTHS_FACT: &str = "age_months";

/// 默认的志愿数量上限
pub const DEFAULT_MAX_PREFERENCES: usize = 3;

// ==========================================
// FactValue - 档案事实取值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FactValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FactValue {
    /// 类型名称 (用于错误提示)
    pub fn type_name(&self) -> &'static str {
        match self {
            FactValue::Bool(_) => "bool",
            FactValue::Number(_) => "number",
            FactValue::Text(_) => "text",
        }
    }
}

// ==========================================
// DaycarePreference - 志愿
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaycarePreference {
    pub rank: u8,           // 志愿顺位 (1 = 第一志愿)
    pub daycare_id: String, // 托育机构ID
}

// ==========================================
// Child - 儿童
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Child {
    // ===== 主键 =====
    pub child_id: String,

    // ===== 基本信息 =====
    pub name: String,
    pub birth_date: NaiveDate,
    pub status: ChildStatus,

    // ===== 志愿 (按 rank 升序) =====
    pub preferences: Vec<DaycarePreference>,

    // ===== 档案事实 (评分标准的输入) =====
    pub profile: BTreeMap<String, FactValue>,

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Child {
    /// 计算指定日期时的周岁
    ///
    /// 出生日期晚于 `on` 时返回 0
    pub fn age_in_years(&self, on: NaiveDate) -> u32 {
        age_in_months(self.birth_date, on) / 12
    }

    /// 计算指定日期时的月龄
    pub fn age_in_months(&self, on: NaiveDate) -> u32 {
        age_in_months(self.birth_date, on)
    }

    /// 读取档案事实
    ///
    /// `age_months` 为派生事实,永远由出生日期计算,忽略档案中的同名值
    pub fn fact(&self, key: &str, on: NaiveDate) -> Option<FactValue> {
        if key == AGE_MONTHS_FACT {
            return Some(FactValue::Number(self.age_in_months(on) as f64));
        }
        self.profile.get(key).cloned()
    }

    /// 按志愿顺位排序后的志愿列表
    pub fn ranked_preferences(&self) -> Vec<&DaycarePreference> {
        let mut prefs: Vec<&DaycarePreference> = self.preferences.iter().collect();
        prefs.sort_by_key(|p| p.rank);
        prefs
    }

    /// 校验志愿列表: 1..=max 条、机构不重复、顺位为 1..=n 连续
    pub fn validate_preferences(&self, max_preferences: usize) -> Result<(), String> {
        let count = self.preferences.len();
        if count == 0 {
            return Err("至少需要一个托育机构志愿".to_string());
        }
        if count > max_preferences {
            return Err(format!(
                "志愿数量超过上限: count={}, max={}",
                count, max_preferences
            ));
        }

        let mut seen = HashSet::new();
        for pref in &self.preferences {
            if !seen.insert(pref.daycare_id.as_str()) {
                return Err(format!("志愿机构重复: daycare_id={}", pref.daycare_id));
            }
        }

        let mut ranks: Vec<u8> = self.preferences.iter().map(|p| p.rank).collect();
        ranks.sort_unstable();
        let expected: Vec<u8> = (1..=count as u8).collect();
        if ranks != expected {
            return Err(format!("志愿顺位必须为 1..{} 且不重复: {:?}", count, ranks));
        }

        Ok(())
    }
}

/// 按日历计算满月数
fn age_in_months(birth_date: NaiveDate, on: NaiveDate) -> u32 {
    if on <= birth_date {
        return 0;
    }
    let mut months = (on.year() - birth_date.year()) * 12 + on.month() as i32
        - birth_date.month() as i32;
    if on.day() < birth_date.day() {
        months -= 1;
    }
    months.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child_born(birth: NaiveDate, prefs: &[(u8, &str)]) -> Child {
        Child {
            child_id: "C001".to_string(),
            name: "测试儿童".to_string(),
            birth_date: birth,
            status: ChildStatus::Waiting,
            preferences: prefs
                .iter()
                .map(|(rank, id)| DaycarePreference {
                    rank: *rank,
                    daycare_id: id.to_string(),
                })
                .collect(),
            profile: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_age_is_derived_from_birth_date() {
        let child = child_born(NaiveDate::from_ymd_opt(2023, 5, 20).unwrap(), &[(1, "D1")]);

        let day_before = NaiveDate::from_ymd_opt(2025, 5, 19).unwrap();
        let birthday = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();

        assert_eq!(child.age_in_years(day_before), 1);
        assert_eq!(child.age_in_years(birthday), 2);
        assert_eq!(child.age_in_months(day_before), 23);
        assert_eq!(child.age_in_months(birthday), 24);
    }

    #[test]
    fn test_age_before_birth_is_zero() {
        let child = child_born(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), &[(1, "D1")]);
        assert_eq!(child.age_in_months(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()), 0);
    }

    #[test]
    fn test_age_fact_ignores_stored_value() {
        let mut child = child_born(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), &[(1, "D1")]);
        child
            .profile
            .insert(AGE_MONTHS_FACT.to_string(), FactValue::Number(99.0));

        let on = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert_eq!(child.fact(AGE_MONTHS_FACT, on), Some(FactValue::Number(12.0)));
    }

    #[test]
    fn test_validate_preferences() {
        let birth = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert!(child_born(birth, &[(1, "D1"), (2, "D2"), (3, "D3")])
            .validate_preferences(3)
            .is_ok());
        assert!(child_born(birth, &[]).validate_preferences(3).is_err());
        assert!(child_born(birth, &[(1, "D1"), (2, "D1")])
            .validate_preferences(3)
            .is_err());
        assert!(child_born(birth, &[(1, "D1"), (3, "D2")])
            .validate_preferences(3)
            .is_err());
        assert!(child_born(birth, &[(1, "D1"), (2, "D2"), (3, "D3"), (4, "D4")])
            .validate_preferences(3)
            .is_err());
    }

    #[test]
    fn test_ranked_preferences_sorted() {
        let child = child_born(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            &[(2, "D2"), (1, "D1")],
        );
        let ids: Vec<&str> = child
            .ranked_preferences()
            .iter()
            .map(|p| p.daycare_id.as_str())
            .collect();
        assert_eq!(ids, vec!["D1", "D2"]);
    }
}
