// ==========================================
// 托育候补名单系统 - 候补条目领域模型
// ==========================================
// 红线: 每个儿童至多一个活跃条目 (WAITING / PAUSED)
// 红线: WAITING 条目的 position 为 1..N 稠密排列
// ==========================================

use crate::domain::criterion::AppliedCriterion;
use crate::domain::types::WaitlistStatus;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 占位排名: 插入时写入,随后由全量重排覆盖
pub const PLACEHOLDER_POSITION: i64 = 0;

// ==========================================
// WaitlistEntry - 候补条目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntry {
    // ===== 主键 =====
    pub entry_id: String,
    pub child_id: String,

    // ===== 评分 =====
    pub total_score: u32,
    pub applied_criteria: Vec<AppliedCriterion>, // 审计快照

    // ===== 排队 =====
    pub position: i64,                  // 0 = 未排名 (占位/暂停/终态)
    pub enrollment_date: NaiveDateTime, // 登记时间 (同分先到先得)
    pub status: WaitlistStatus,

    // ===== 审计字段 =====
    pub updated_at: DateTime<Utc>,
}

impl WaitlistEntry {
    pub fn is_ranked(&self) -> bool {
        self.status == WaitlistStatus::Waiting && self.position > PLACEHOLDER_POSITION
    }
}

/// 排队顺序比较
///
/// 排序键:
/// 1) total_score 降序
/// 2) enrollment_date 升序 (先登记优先)
/// 3) child_id 升序 (保证确定性)
pub fn queue_order(a: &WaitlistEntry, b: &WaitlistEntry) -> Ordering {
    b.total_score
        .cmp(&a.total_score)
        .then_with(|| a.enrollment_date.cmp(&b.enrollment_date))
        .then_with(|| a.child_id.cmp(&b.child_id))
}
