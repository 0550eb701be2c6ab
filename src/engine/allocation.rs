// ==========================================
// 托育候补名单系统 - 名额匹配引擎
// ==========================================
// 职责: 按候补排名逐个儿童、按志愿顺序逐个机构分配名额
// 输入: 排名后的 WAITING 条目 + 志愿 + 实时名额
// 输出: allocation 记录 + 条目置为 ALLOCATED + 儿童置为 ENROLLED
// ==========================================
// 红线: 整轮匹配为一个原子事务,任何结构性错误整体回滚
// 红线: 名额逐个儿童实时重新查询,不使用轮次开始时的快照
// 红线: 先到排名优先,不做回溯/全局最优
// ==========================================

mod types;


pub use types::AllocationRunParams;

use crate::config::ConfigManager;
use crate::domain::action_log::ActionType;
use crate::domain::allocation::{
    Allocation, AllocationDetail, AllocationOptions, AllocationRunResult,
};
use crate::domain::types::{AllocationStatus, ChildStatus, RemovalReason, WaitlistStatus};
use crate::engine::audit;
use crate::engine::capacity::CapacityTracker;
use crate::engine::clock::Clock;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::waitlist::WaitlistManager;
use crate::repository::{AllocationRepository, ChildRepository, SqliteStore, WaitlistRepository};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// AllocationMatcher - 名额匹配引擎
// ==========================================
pub struct AllocationMatcher {
    store: SqliteStore,
    waitlist: Arc<WaitlistManager>,
    capacity: CapacityTracker,
    config: ConfigManager,
    clock: Arc<dyn Clock>,
}

/// 单个儿童的匹配结果
enum ChildOutcome {
    Placed(AllocationDetail),
    Unplaced(String),
}

impl AllocationMatcher {
    pub fn new(
        store: SqliteStore,
        waitlist: Arc<WaitlistManager>,
        config: ConfigManager,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            waitlist,
            capacity: CapacityTracker::new(),
            config,
            clock,
        }
    }

    /// 执行一轮匹配
    ///
    /// # 规则
    /// 1) (可选) 先重算全部 WAITING 条目分数并重排
    /// 2) 按排名升序逐个儿童处理,达到 limit 即停止
    /// 3) 每个儿童按志愿顺序取第一个有名额的机构
    /// 4) 无可用志愿的儿童留在候补,并写入 errors 诊断
    ///
    /// # 返回
    /// - Ok(AllocationRunResult): 本轮结果 (errors 为诊断信息,非失败)
    /// - Err(CapacityExceededAttempt / TransactionFailure): 整轮回滚
    #[instrument(skip(self, options), fields(
        limit = ?options.limit,
        recalculate = ?options.recalculate_scores
    ))]
    pub fn run(&self, options: &AllocationOptions, actor: &str) -> EngineResult<AllocationRunResult> {
        // 配置读取必须在事务之外完成
        let defaults = self.config.get_allocation_defaults()?;
        let config_snapshot = self.config.get_config_snapshot()?;
        let params = AllocationRunParams::resolve(options, &defaults, self.clock.today());
        let now = self.clock.now();

        tracing::info!(
            "开始名额匹配: limit={:?}, recalculate={}, start_date={}",
            params.limit,
            params.recalculate_scores,
            params.start_date
        );

        let result = self.store.in_transaction(|tx| {
            let result = self.run_in(tx, options, &params, actor, now)?;

            audit::record(
                tx,
                ActionType::AllocationRun,
                None,
                actor,
                now,
                Some(json!({
                    "options": options,
                    "params": params,
                    "allocations_made": result.allocations_made,
                    "error_count": result.errors.len(),
                    "config_snapshot": config_snapshot,
                })),
                None,
            )?;
            Ok(result)
        });

        match &result {
            Ok(r) => tracing::info!(
                "名额匹配完成: allocations_made={}, errors={}",
                r.allocations_made,
                r.errors.len()
            ),
            Err(e) => tracing::error!("名额匹配失败,已整体回滚: {}", e),
        }
        result
    }

    // ==========================================
    // 事务内流程
    // ==========================================

    fn run_in(
        &self,
        conn: &Connection,
        options: &AllocationOptions,
        params: &AllocationRunParams,
        actor: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<AllocationRunResult> {
        let mut result = AllocationRunResult::default();

        // 1. 重算分数
        if params.recalculate_scores {
            self.recalculate_in(conn, actor, now, &mut result.errors)?;
        }

        // 2. 按排名逐个儿童匹配
        let queue = WaitlistRepository::new(conn).find_waiting_ordered()?;
        for entry in queue {
            if params.limit.is_some_and(|limit| result.allocations_made >= limit) {
                break;
            }

            match self.place_child(conn, &entry.child_id, options, params, actor, now)? {
                ChildOutcome::Placed(detail) => {
                    result.allocations_made += 1;
                    result.details.push(detail);
                }
                ChildOutcome::Unplaced(reason) => result.errors.push(reason),
            }
        }

        Ok(result)
    }

    /// 重算全部 WAITING 条目; 无法评估的儿童保留旧分数并记录诊断
    fn recalculate_in(
        &self,
        conn: &Connection,
        actor: &str,
        now: DateTime<Utc>,
        errors: &mut Vec<String>,
    ) -> EngineResult<()> {
        let waiting = WaitlistRepository::new(conn).find_by_status(WaitlistStatus::Waiting)?;
        for entry in waiting {
            match self
                .waitlist
                .recompute_score_in(conn, &entry.child_id, actor, now, false)
            {
                Ok(_) => {}
                Err(e @ EngineError::InvalidChildState { .. }) => {
                    tracing::warn!("重算跳过: {}", e);
                    errors.push(format!("重算失败,保留原分数 {}: {}", entry.total_score, e));
                }
                Err(e) => return Err(e),
            }
        }
        self.waitlist.reorder_in(conn, now)?;
        Ok(())
    }

    fn place_child(
        &self,
        conn: &Connection,
        child_id: &str,
        options: &AllocationOptions,
        params: &AllocationRunParams,
        actor: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<ChildOutcome> {
        let child = ChildRepository::new(conn).get(child_id)?;
        if child.status != ChildStatus::Waiting {
            return Ok(ChildOutcome::Unplaced(format!(
                "儿童状态不可分配: child_id={}, status={}",
                child_id, child.status
            )));
        }

        let age_years = child.age_in_years(now.date_naive());
        let mut considered = 0usize;

        for preference in child.ranked_preferences() {
            if !options.allows_daycare(&preference.daycare_id) {
                continue;
            }
            considered += 1;

            let available =
                match self
                    .capacity
                    .available_capacity(conn, &preference.daycare_id, age_years)
                {
                    Ok(n) => n,
                    Err(EngineError::NotFound { .. }) => {
                        tracing::warn!(
                            "志愿机构不存在: child_id={}, daycare_id={}",
                            child_id,
                            preference.daycare_id
                        );
                        continue;
                    }
                    Err(e) => return Err(e),
                };
            if available == 0 {
                continue;
            }

            // 写入前再次确认具体班组仍有空位
            let group = self
                .capacity
                .pick_group(conn, &preference.daycare_id, age_years)?
                .filter(|g| g.available() > 0)
                .ok_or_else(|| EngineError::CapacityExceededAttempt {
                    daycare_id: preference.daycare_id.clone(),
                    child_id: child_id.to_string(),
                    detail: format!("机构可用名额={}, 但无适配班组有空位", available),
                })?;

            let allocation = Allocation {
                allocation_id: Uuid::new_v4().to_string(),
                child_id: child_id.to_string(),
                daycare_id: preference.daycare_id.clone(),
                group_id: group.group_id.clone(),
                start_date: params.start_date,
                end_date: None,
                status: AllocationStatus::Active,
                created_at: now,
            };
            AllocationRepository::new(conn).insert(&allocation)?;

            self.waitlist
                .remove_in(conn, child_id, RemovalReason::Allocated, actor, now)?;
            ChildRepository::new(conn).update_status(child_id, ChildStatus::Enrolled, now)?;

            audit::record(
                conn,
                ActionType::Allocate,
                Some(child_id),
                actor,
                now,
                Some(json!({
                    "allocation_id": allocation.allocation_id,
                    "daycare_id": allocation.daycare_id,
                    "group_id": allocation.group_id,
                    "preference_rank": preference.rank,
                    "start_date": allocation.start_date,
                })),
                None,
            )?;

            tracing::debug!(
                "分配名额: child_id={}, daycare_id={}, group_id={}, rank={}",
                child_id,
                allocation.daycare_id,
                allocation.group_id,
                preference.rank
            );

            return Ok(ChildOutcome::Placed(AllocationDetail {
                child_id: child_id.to_string(),
                daycare_id: allocation.daycare_id,
                group_id: allocation.group_id,
                preference_rank: preference.rank,
            }));
        }

        let reason = if considered == 0 {
            format!("无可考虑的志愿机构: child_id={}", child_id)
        } else {
            format!(
                "志愿机构均无可用名额: child_id={}, 年龄={}岁, 考虑志愿数={}",
                child_id, age_years, considered
            )
        };
        Ok(ChildOutcome::Unplaced(reason))
    }
}
