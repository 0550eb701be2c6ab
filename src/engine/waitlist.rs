// ==========================================
// 托育候补名单系统 - 候补名单管理引擎
// ==========================================
// 职责: 候补条目的插入、移出、暂停/恢复、重算与全量重排
// 状态机: none → WAITING → {ALLOCATED | REMOVED}, WAITING ⇄ PAUSED
// ==========================================
// 红线: 插入时写占位排名,同一事务内立即全量重排
//       (禁止 "COUNT(*)+1" 式的排名计算)
// 红线: 重排后 WAITING 条目的排名为 1..N 稠密排列
// 红线: 每个公开操作为一个原子事务
// ==========================================

use crate::config::ConfigManager;
use crate::domain::action_log::ActionType;
use crate::domain::child::{Child, DaycarePreference, FactValue};
use crate::domain::types::{AllocationStatus, ChildStatus, RemovalReason, WaitlistStatus};
use crate::domain::waitlist::{queue_order, WaitlistEntry, PLACEHOLDER_POSITION};
use crate::engine::audit;
use crate::engine::clock::Clock;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::scoring::{ScoreResult, ScoringEngine};
use crate::repository::{
    AllocationRepository, ChildRepository, CriterionRepository, RepositoryError, SqliteStore,
    WaitlistRepository,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// 全量重排结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderSummary {
    /// 参与排名的 WAITING 条目数 (N)
    pub ranked: usize,
    /// 排名发生变化的条目数
    pub changed: usize,
}

// ==========================================
// WaitlistManager - 候补名单管理引擎
// ==========================================
pub struct WaitlistManager {
    store: SqliteStore,
    config: ConfigManager,
    scoring: ScoringEngine,
    clock: Arc<dyn Clock>,
}

impl WaitlistManager {
    pub fn new(store: SqliteStore, config: ConfigManager, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            scoring: ScoringEngine::new(),
            clock,
        }
    }

    // ==========================================
    // 公开操作 (各自一个事务)
    // ==========================================

    /// 登记儿童并进入候补 (同一事务)
    #[instrument(skip(self, child), fields(child_id = %child.child_id))]
    pub fn register(&self, child: &Child, actor: &str) -> EngineResult<WaitlistEntry> {
        let max_preferences = self.config.get_max_preferences()?;
        let now = self.clock.now();

        let entry = self.store.in_transaction(|tx| {
            ChildRepository::new(tx).insert(child)?;
            self.enqueue_in(tx, &child.child_id, actor, max_preferences, now)
        })?;

        tracing::info!(
            "儿童登记并进入候补: child_id={}, score={}, position={}",
            entry.child_id,
            entry.total_score,
            entry.position
        );
        Ok(entry)
    }

    /// 已登记儿童进入候补
    ///
    /// # 返回
    /// - Ok(WaitlistEntry): 重排后的条目 (含最终排名)
    /// - Err(DuplicateActiveEntry): 已有活跃条目
    /// - Err(InvalidChildState): 档案不足以评分
    #[instrument(skip(self))]
    pub fn enqueue(&self, child_id: &str, actor: &str) -> EngineResult<WaitlistEntry> {
        let max_preferences = self.config.get_max_preferences()?;
        let now = self.clock.now();

        let entry = self
            .store
            .in_transaction(|tx| self.enqueue_in(tx, child_id, actor, max_preferences, now))?;

        tracing::info!(
            "儿童进入候补: child_id={}, score={}, position={}",
            child_id,
            entry.total_score,
            entry.position
        );
        Ok(entry)
    }

    /// 全量重排
    #[instrument(skip(self))]
    pub fn reorder(&self, actor: &str) -> EngineResult<ReorderSummary> {
        let now = self.clock.now();
        self.store.in_transaction(|tx| {
            let summary = self.reorder_in(tx, now)?;
            audit::record(
                tx,
                ActionType::Reorder,
                None,
                actor,
                now,
                Some(json!(summary)),
                None,
            )?;
            Ok(summary)
        })
    }

    /// 移出候补 (ALLOCATED / REMOVED) 并重排
    ///
    /// ALLOCATED 仅在儿童持有活跃分配时接受; 正常分配路径由匹配器完成
    #[instrument(skip(self))]
    pub fn remove(
        &self,
        child_id: &str,
        reason: RemovalReason,
        actor: &str,
    ) -> EngineResult<WaitlistEntry> {
        let now = self.clock.now();
        self.store.in_transaction(|tx| {
            if reason == RemovalReason::Allocated
                && AllocationRepository::new(tx)
                    .find_active_by_child(child_id)?
                    .is_none()
            {
                return Err(EngineError::InvalidStateTransition {
                    child_id: child_id.to_string(),
                    from: "NO_ACTIVE_ALLOCATION".to_string(),
                    to: WaitlistStatus::Allocated.to_string(),
                });
            }
            self.remove_in(tx, child_id, reason, actor, now)
        })
    }

    /// 重算分数并重排
    #[instrument(skip(self))]
    pub fn recompute_score(&self, child_id: &str, actor: &str) -> EngineResult<ScoreResult> {
        let now = self.clock.now();
        self.store
            .in_transaction(|tx| self.recompute_score_in(tx, child_id, actor, now, true))
    }

    /// 行政暂停 (暂停期间不参与排名)
    #[instrument(skip(self))]
    pub fn pause(&self, child_id: &str, actor: &str) -> EngineResult<WaitlistEntry> {
        let now = self.clock.now();
        self.store.in_transaction(|tx| {
            self.transition_in(
                tx,
                child_id,
                WaitlistStatus::Waiting,
                WaitlistStatus::Paused,
                ActionType::Pause,
                actor,
                now,
            )
        })
    }

    /// 恢复排队 (保留原登记时间)
    #[instrument(skip(self))]
    pub fn resume(&self, child_id: &str, actor: &str) -> EngineResult<WaitlistEntry> {
        let now = self.clock.now();
        self.store.in_transaction(|tx| {
            self.transition_in(
                tx,
                child_id,
                WaitlistStatus::Paused,
                WaitlistStatus::Waiting,
                ActionType::Resume,
                actor,
                now,
            )
        })
    }

    /// 儿童退出: 移出候补、结束有效分配、状态置为 WITHDRAWN
    #[instrument(skip(self))]
    pub fn withdraw(&self, child_id: &str, actor: &str) -> EngineResult<()> {
        let now = self.clock.now();
        self.store
            .in_transaction(|tx| self.withdraw_in(tx, child_id, actor, now))?;
        tracing::info!("儿童退出: child_id={}", child_id);
        Ok(())
    }

    /// 覆盖档案事实; 若在候补中则重算分数并重排
    ///
    /// # 返回
    /// - Ok(Some(ScoreResult)): 已重算
    /// - Ok(None): 无活跃条目,未重算
    #[instrument(skip(self, profile))]
    pub fn update_profile(
        &self,
        child_id: &str,
        profile: &BTreeMap<String, FactValue>,
        actor: &str,
    ) -> EngineResult<Option<ScoreResult>> {
        let now = self.clock.now();
        self.store.in_transaction(|tx| {
            ChildRepository::new(tx).update_profile(child_id, profile, now)?;
            self.recompute_if_active(tx, child_id, actor, now)
        })
    }

    /// 覆盖志愿; 若在候补中则重算分数并重排
    #[instrument(skip(self, preferences))]
    pub fn update_preferences(
        &self,
        child_id: &str,
        preferences: &[DaycarePreference],
        actor: &str,
    ) -> EngineResult<Option<ScoreResult>> {
        let max_preferences = self.config.get_max_preferences()?;
        let now = self.clock.now();
        self.store.in_transaction(|tx| {
            let child_repo = ChildRepository::new(tx);
            let mut child = child_repo.get(child_id)?;
            child.preferences = preferences.to_vec();
            child
                .validate_preferences(max_preferences)
                .map_err(|reason| EngineError::InvalidPreferences {
                    child_id: child_id.to_string(),
                    reason,
                })?;

            child_repo.replace_preferences(child_id, preferences)?;
            self.recompute_if_active(tx, child_id, actor, now)
        })
    }

    // ==========================================
    // 只读查询
    // ==========================================

    /// 计算当前分数 (不落库)
    pub fn compute_score(&self, child_id: &str) -> EngineResult<ScoreResult> {
        let today = self.clock.today();
        self.store.read(|conn| {
            let child = ChildRepository::new(conn).get(child_id)?;
            let criteria = CriterionRepository::new(conn).find_active()?;
            self.scoring.score(&child, &criteria, today)
        })
    }

    /// 排队中条目,按排名升序
    pub fn ordered_queue(&self) -> EngineResult<Vec<WaitlistEntry>> {
        self.store
            .read(|conn| Ok(WaitlistRepository::new(conn).find_waiting_ordered()?))
    }

    /// 儿童的活跃条目
    pub fn active_entry(&self, child_id: &str) -> EngineResult<Option<WaitlistEntry>> {
        self.store
            .read(|conn| Ok(WaitlistRepository::new(conn).find_active_by_child(child_id)?))
    }

    // ==========================================
    // 事务内操作 (供 AllocationMatcher 复用同一事务)
    // ==========================================

    pub(crate) fn enqueue_in(
        &self,
        conn: &Connection,
        child_id: &str,
        actor: &str,
        max_preferences: usize,
        now: DateTime<Utc>,
    ) -> EngineResult<WaitlistEntry> {
        let waitlist_repo = WaitlistRepository::new(conn);
        let child = ChildRepository::new(conn).get(child_id)?;

        if let Some(existing) = waitlist_repo.find_active_by_child(child_id)? {
            return Err(EngineError::DuplicateActiveEntry {
                child_id: child_id.to_string(),
                entry_id: existing.entry_id,
            });
        }
        if child.status != ChildStatus::Waiting {
            return Err(EngineError::InvalidStateTransition {
                child_id: child_id.to_string(),
                from: child.status.to_string(),
                to: WaitlistStatus::Waiting.to_string(),
            });
        }
        if let Some(allocation) = AllocationRepository::new(conn).find_active_by_child(child_id)? {
            return Err(EngineError::InvalidStateTransition {
                child_id: child_id.to_string(),
                from: format!("ACTIVE_ALLOCATION({})", allocation.allocation_id),
                to: WaitlistStatus::Waiting.to_string(),
            });
        }
        child
            .validate_preferences(max_preferences)
            .map_err(|reason| EngineError::InvalidPreferences {
                child_id: child_id.to_string(),
                reason,
            })?;

        let criteria = CriterionRepository::new(conn).find_active()?;
        let score = self.scoring.score(&child, &criteria, now.date_naive())?;

        // 1. 占位排名插入
        let entry = WaitlistEntry {
            entry_id: Uuid::new_v4().to_string(),
            child_id: child_id.to_string(),
            total_score: score.total,
            applied_criteria: score.applied.clone(),
            position: PLACEHOLDER_POSITION,
            enrollment_date: now.naive_utc(),
            status: WaitlistStatus::Waiting,
            updated_at: now,
        };
        waitlist_repo.insert(&entry).map_err(|e| match e {
            // 跨进程并发插入时由部分唯一索引兜底
            RepositoryError::UniqueConstraintViolation(_) => EngineError::DuplicateActiveEntry {
                child_id: child_id.to_string(),
                entry_id: entry.entry_id.clone(),
            },
            other => other.into(),
        })?;

        // 2. 同一事务内全量重排
        self.reorder_in(conn, now)?;

        audit::record(
            conn,
            ActionType::Enqueue,
            Some(child_id),
            actor,
            now,
            Some(json!({
                "entry_id": entry.entry_id,
                "total_score": score.total,
                "applied": score.applied,
            })),
            None,
        )?;

        waitlist_repo
            .find_active_by_child(child_id)?
            .ok_or_else(|| EngineError::not_found("WaitlistEntry", child_id))
    }

    /// 全量重排
    ///
    /// 排序键: (score DESC, enrollment_date ASC, child_id ASC)
    /// 排名 = 1-based 名次,全部在调用方事务中写入
    pub(crate) fn reorder_in(
        &self,
        conn: &Connection,
        now: DateTime<Utc>,
    ) -> EngineResult<ReorderSummary> {
        let repo = WaitlistRepository::new(conn);

        let mut waiting = repo.find_by_status(WaitlistStatus::Waiting)?;
        waiting.sort_by(queue_order);

        let positions: Vec<(String, i64)> = waiting
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.entry_id.clone(), idx as i64 + 1))
            .collect();
        let changed = repo.update_positions(&positions, now)?;

        tracing::debug!("候补名单全量重排: ranked={}, changed={}", positions.len(), changed);

        Ok(ReorderSummary {
            ranked: positions.len(),
            changed,
        })
    }

    pub(crate) fn remove_in(
        &self,
        conn: &Connection,
        child_id: &str,
        reason: RemovalReason,
        actor: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<WaitlistEntry> {
        let repo = WaitlistRepository::new(conn);
        let mut entry = repo
            .find_active_by_child(child_id)?
            .ok_or_else(|| EngineError::not_found("WaitlistEntry", child_id))?;

        let target = reason.target_status();
        let previous_position = entry.position;
        repo.update_status(&entry.entry_id, target, PLACEHOLDER_POSITION, now)?;
        self.reorder_in(conn, now)?;

        audit::record(
            conn,
            ActionType::Remove,
            Some(child_id),
            actor,
            now,
            Some(json!({
                "entry_id": entry.entry_id,
                "status": target.as_str(),
                "previous_position": previous_position,
            })),
            None,
        )?;

        entry.status = target;
        entry.position = PLACEHOLDER_POSITION;
        entry.updated_at = now;
        Ok(entry)
    }

    pub(crate) fn recompute_score_in(
        &self,
        conn: &Connection,
        child_id: &str,
        actor: &str,
        now: DateTime<Utc>,
        reorder: bool,
    ) -> EngineResult<ScoreResult> {
        let repo = WaitlistRepository::new(conn);
        let entry = repo
            .find_active_by_child(child_id)?
            .ok_or_else(|| EngineError::not_found("WaitlistEntry", child_id))?;

        let child = ChildRepository::new(conn).get(child_id)?;
        let criteria = CriterionRepository::new(conn).find_active()?;
        let score = self.scoring.score(&child, &criteria, now.date_naive())?;

        repo.update_score(&entry.entry_id, score.total, &score.applied, now)?;
        if reorder {
            self.reorder_in(conn, now)?;
        }

        if entry.total_score != score.total {
            audit::record(
                conn,
                ActionType::RecomputeScore,
                Some(child_id),
                actor,
                now,
                Some(json!({
                    "entry_id": entry.entry_id,
                    "previous_score": entry.total_score,
                    "total_score": score.total,
                    "applied": score.applied,
                })),
                None,
            )?;
        }

        Ok(score)
    }

    fn recompute_if_active(
        &self,
        conn: &Connection,
        child_id: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<Option<ScoreResult>> {
        if WaitlistRepository::new(conn)
            .find_active_by_child(child_id)?
            .is_none()
        {
            return Ok(None);
        }
        self.recompute_score_in(conn, child_id, actor, now, true)
            .map(Some)
    }

    /// WAITING ⇄ PAUSED
    #[allow(clippy::too_many_arguments)]
    fn transition_in(
        &self,
        conn: &Connection,
        child_id: &str,
        from: WaitlistStatus,
        to: WaitlistStatus,
        action_type: ActionType,
        actor: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<WaitlistEntry> {
        let repo = WaitlistRepository::new(conn);
        let entry = repo
            .find_active_by_child(child_id)?
            .ok_or_else(|| EngineError::not_found("WaitlistEntry", child_id))?;

        if entry.status != from {
            return Err(EngineError::InvalidStateTransition {
                child_id: child_id.to_string(),
                from: entry.status.to_string(),
                to: to.to_string(),
            });
        }

        repo.update_status(&entry.entry_id, to, PLACEHOLDER_POSITION, now)?;
        self.reorder_in(conn, now)?;

        audit::record(
            conn,
            action_type,
            Some(child_id),
            actor,
            now,
            Some(json!({ "entry_id": entry.entry_id, "previous_position": entry.position })),
            None,
        )?;

        repo.find_active_by_child(child_id)?
            .ok_or_else(|| EngineError::not_found("WaitlistEntry", child_id))
    }

    fn withdraw_in(
        &self,
        conn: &Connection,
        child_id: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let child_repo = ChildRepository::new(conn);
        let child = child_repo.get(child_id)?;
        if child.status == ChildStatus::Withdrawn {
            return Err(EngineError::InvalidStateTransition {
                child_id: child_id.to_string(),
                from: child.status.to_string(),
                to: ChildStatus::Withdrawn.to_string(),
            });
        }

        if WaitlistRepository::new(conn)
            .find_active_by_child(child_id)?
            .is_some()
        {
            self.remove_in(conn, child_id, RemovalReason::Removed, actor, now)?;
        }

        let allocation_repo = AllocationRepository::new(conn);
        let mut closed_allocation = None;
        if let Some(allocation) = allocation_repo.find_active_by_child(child_id)? {
            let today = now.date_naive();
            // 尚未开始的分配视为取消,已开始的视为结束
            let status = if allocation.start_date > today {
                AllocationStatus::Cancelled
            } else {
                AllocationStatus::Completed
            };
            allocation_repo.close(&allocation.allocation_id, status, today)?;
            closed_allocation = Some((allocation.allocation_id, status));
        }

        child_repo.update_status(child_id, ChildStatus::Withdrawn, now)?;

        audit::record(
            conn,
            ActionType::Withdraw,
            Some(child_id),
            actor,
            now,
            Some(json!({
                "previous_status": child.status.as_str(),
                "closed_allocation": closed_allocation
                    .map(|(id, status)| json!({ "allocation_id": id, "status": status.as_str() })),
            })),
            None,
        )
    }
}
