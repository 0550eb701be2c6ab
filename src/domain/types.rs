// ==========================================
// 托育候补名单系统 - 领域类型定义
// ==========================================
// 状态一律使用显式枚举,不使用 "deleted" 布尔标志
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 枚举解析失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub type_name: &'static str,
    pub value: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "无法解析 {}: {}", self.type_name, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

/// 为 "数据库字符串 <-> 枚举" 生成 as_str / Display / FromStr
macro_rules! db_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// 转换为字符串 (用于数据库存储)
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        type_name: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

// ==========================================
// 儿童状态 (Child Status)
// ==========================================
// 红线: 儿童记录不做物理删除,退出以 WITHDRAWN 表达
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChildStatus {
    Waiting,     // 候补中
    Enrolled,    // 已入托
    Irregular,   // 资料异常
    Withdrawn,   // 已退出
    Transferred, // 已转出
}

db_enum!(ChildStatus {
    Waiting => "WAITING",
    Enrolled => "ENROLLED",
    Irregular => "IRREGULAR",
    Withdrawn => "WITHDRAWN",
    Transferred => "TRANSFERRED",
});

// ==========================================
// 候补条目状态 (Waitlist Entry Status)
// ==========================================
// 状态机: WAITING <-> PAUSED, WAITING -> {ALLOCATED | REMOVED}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaitlistStatus {
    Waiting,   // 排队中 (参与排名)
    Paused,    // 行政暂停 (不参与排名)
    Allocated, // 已分配名额 (终态)
    Removed,   // 已移出 (终态)
}

db_enum!(WaitlistStatus {
    Waiting => "WAITING",
    Paused => "PAUSED",
    Allocated => "ALLOCATED",
    Removed => "REMOVED",
});

impl WaitlistStatus {
    /// 是否为活跃条目 (每个儿童至多一条)
    pub fn is_active(&self) -> bool {
        matches!(self, WaitlistStatus::Waiting | WaitlistStatus::Paused)
    }
}

/// 移出候补名单的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemovalReason {
    Allocated, // 分配成功
    Removed,   // 行政移出 / 退出
}

impl RemovalReason {
    /// 对应的终态
    pub fn target_status(&self) -> WaitlistStatus {
        match self {
            RemovalReason::Allocated => WaitlistStatus::Allocated,
            RemovalReason::Removed => WaitlistStatus::Removed,
        }
    }
}

// ==========================================
// 分配状态 (Allocation Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    Active,    // 生效中 (计入占用)
    Cancelled, // 已取消
    Completed, // 已结束
}

db_enum!(AllocationStatus {
    Active => "ACTIVE",
    Cancelled => "CANCELLED",
    Completed => "COMPLETED",
});

// ==========================================
// 班组时段 (Shift)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Shift {
    Morning,   // 上午
    Afternoon, // 下午
    FullTime,  // 全日
}

db_enum!(Shift {
    Morning => "MORNING",
    Afternoon => "AFTERNOON",
    FullTime => "FULL_TIME",
});

// ==========================================
// 评分标准类型 (Criterion Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriterionKind {
    Boolean,    // 布尔事实
    Numeric,    // 数值比较
    Enumerated, // 枚举取值
}

db_enum!(CriterionKind {
    Boolean => "BOOLEAN",
    Numeric => "NUMERIC",
    Enumerated => "ENUMERATED",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_strings() {
        assert_eq!(ChildStatus::Withdrawn.as_str(), "WITHDRAWN");
        assert_eq!("PAUSED".parse::<WaitlistStatus>(), Ok(WaitlistStatus::Paused));
        assert_eq!(Shift::FullTime.to_string(), "FULL_TIME");
        assert!("deleted".parse::<ChildStatus>().is_err());
    }

    #[test]
    fn test_active_waitlist_statuses() {
        assert!(WaitlistStatus::Waiting.is_active());
        assert!(WaitlistStatus::Paused.is_active());
        assert!(!WaitlistStatus::Allocated.is_active());
        assert!(!WaitlistStatus::Removed.is_active());
        assert_eq!(RemovalReason::Allocated.target_status(), WaitlistStatus::Allocated);
    }
}
