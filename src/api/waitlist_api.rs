// ==========================================
// 托育候补名单系统 - 候补名单 API
// ==========================================
// 职责: 对外门面,组装引擎并校验调用参数
// 红线: 参数校验在进入引擎事务之前完成
// ==========================================

mod catalog;

pub use catalog::{SeedChild, SeedData, SeedSummary};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::action_log::ActionLog;
use crate::domain::allocation::{AllocationOptions, AllocationRunResult};
use crate::domain::child::{Child, DaycarePreference, FactValue};
use crate::domain::daycare::GroupAvailability;
use crate::domain::types::RemovalReason;
use crate::domain::waitlist::WaitlistEntry;
use crate::engine::{
    AllocationMatcher, CapacityTracker, Clock, ReorderSummary, ScoreResult, SystemClock,
    WaitlistManager,
};
use crate::repository::{ActionLogRepository, ChildRepository, SqliteStore};

// ==========================================
// WaitlistApi - 候补名单 API
// ==========================================

/// 候补名单API
///
/// 职责：
/// 1. 评分预览与候补登记
/// 2. 候补状态变更（移出、暂停、恢复、退出）
/// 3. 全量重排与名额匹配
/// 4. 机构/班组/评分标准目录维护
pub struct WaitlistApi {
    store: SqliteStore,
    config_manager: ConfigManager,
    waitlist: Arc<WaitlistManager>,
    matcher: AllocationMatcher,
    capacity: CapacityTracker,
    clock: Arc<dyn Clock>,
}

impl WaitlistApi {
    /// 创建新的WaitlistApi实例
    pub fn new(store: SqliteStore, clock: Arc<dyn Clock>) -> Self {
        let config_manager = ConfigManager::new(store.clone());
        let waitlist = Arc::new(WaitlistManager::new(
            store.clone(),
            config_manager.clone(),
            clock.clone(),
        ));
        let matcher = AllocationMatcher::new(
            store.clone(),
            waitlist.clone(),
            config_manager.clone(),
            clock.clone(),
        );

        Self {
            store,
            config_manager,
            waitlist,
            matcher,
            capacity: CapacityTracker::new(),
            clock,
        }
    }

    /// 打开数据库文件,使用系统时钟
    pub fn open(db_path: &str) -> ApiResult<Self> {
        let store = SqliteStore::open(db_path)?;
        Ok(Self::new(store, Arc::new(SystemClock)))
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config_manager
    }

    // ==========================================
    // 评分与候补
    // ==========================================

    /// 计算儿童当前分数 (不落库)
    pub fn compute_score(&self, child_id: &str) -> ApiResult<ScoreResult> {
        require_non_empty("child_id", child_id)?;
        Ok(self.waitlist.compute_score(child_id)?)
    }

    /// 登记新儿童并进入候补
    pub fn register_child(&self, child: &Child, actor: &str) -> ApiResult<WaitlistEntry> {
        require_non_empty("child_id", &child.child_id)?;
        require_non_empty("name", &child.name)?;
        require_non_empty("actor", actor)?;
        if child.birth_date > self.clock.today() {
            return Err(ApiError::InvalidInput(format!(
                "出生日期不能晚于今天: {}",
                child.birth_date
            )));
        }
        Ok(self.waitlist.register(child, actor)?)
    }

    /// 已登记儿童进入候补
    pub fn enqueue(&self, child_id: &str, actor: &str) -> ApiResult<WaitlistEntry> {
        require_non_empty("child_id", child_id)?;
        require_non_empty("actor", actor)?;
        Ok(self.waitlist.enqueue(child_id, actor)?)
    }

    /// 移出候补
    pub fn remove_from_waitlist(
        &self,
        child_id: &str,
        reason: RemovalReason,
        actor: &str,
    ) -> ApiResult<WaitlistEntry> {
        require_non_empty("child_id", child_id)?;
        require_non_empty("actor", actor)?;
        Ok(self.waitlist.remove(child_id, reason, actor)?)
    }

    /// 全量重排
    pub fn reorder_waitlist(&self, actor: &str) -> ApiResult<ReorderSummary> {
        require_non_empty("actor", actor)?;
        Ok(self.waitlist.reorder(actor)?)
    }

    /// 执行一轮名额匹配
    pub fn run_allocation(
        &self,
        options: &AllocationOptions,
        actor: &str,
    ) -> ApiResult<AllocationRunResult> {
        require_non_empty("actor", actor)?;
        if let Some(ids) = &options.restrict_to_daycares {
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err(ApiError::InvalidInput("机构ID不能为空".to_string()));
            }
        }
        Ok(self.matcher.run(options, actor)?)
    }

    pub fn pause(&self, child_id: &str, actor: &str) -> ApiResult<WaitlistEntry> {
        require_non_empty("child_id", child_id)?;
        require_non_empty("actor", actor)?;
        Ok(self.waitlist.pause(child_id, actor)?)
    }

    pub fn resume(&self, child_id: &str, actor: &str) -> ApiResult<WaitlistEntry> {
        require_non_empty("child_id", child_id)?;
        require_non_empty("actor", actor)?;
        Ok(self.waitlist.resume(child_id, actor)?)
    }

    /// 儿童退出
    pub fn withdraw(&self, child_id: &str, actor: &str) -> ApiResult<()> {
        require_non_empty("child_id", child_id)?;
        require_non_empty("actor", actor)?;
        Ok(self.waitlist.withdraw(child_id, actor)?)
    }

    /// 重算分数并重排
    pub fn recompute_score(&self, child_id: &str, actor: &str) -> ApiResult<ScoreResult> {
        require_non_empty("child_id", child_id)?;
        require_non_empty("actor", actor)?;
        Ok(self.waitlist.recompute_score(child_id, actor)?)
    }

    /// 覆盖档案事实
    pub fn update_profile(
        &self,
        child_id: &str,
        profile: &BTreeMap<String, FactValue>,
        actor: &str,
    ) -> ApiResult<Option<ScoreResult>> {
        require_non_empty("child_id", child_id)?;
        require_non_empty("actor", actor)?;
        Ok(self.waitlist.update_profile(child_id, profile, actor)?)
    }

    /// 覆盖志愿
    pub fn update_preferences(
        &self,
        child_id: &str,
        preferences: &[DaycarePreference],
        actor: &str,
    ) -> ApiResult<Option<ScoreResult>> {
        require_non_empty("child_id", child_id)?;
        require_non_empty("actor", actor)?;
        Ok(self.waitlist.update_preferences(child_id, preferences, actor)?)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 排队中的候补名单 (按排名)
    pub fn list_waitlist(&self) -> ApiResult<Vec<WaitlistEntry>> {
        Ok(self.waitlist.ordered_queue()?)
    }

    /// 儿童的活跃候补条目
    pub fn get_entry(&self, child_id: &str) -> ApiResult<Option<WaitlistEntry>> {
        require_non_empty("child_id", child_id)?;
        Ok(self.waitlist.active_entry(child_id)?)
    }

    pub fn get_child(&self, child_id: &str) -> ApiResult<Child> {
        require_non_empty("child_id", child_id)?;
        Ok(self
            .store
            .read(|conn| ChildRepository::new(conn).get(child_id))?)
    }

    /// 机构对指定年龄的可用名额
    pub fn available_capacity(&self, daycare_id: &str, age_years: u32) -> ApiResult<u32> {
        require_non_empty("daycare_id", daycare_id)?;
        Ok(self
            .store
            .read(|conn| self.capacity.available_capacity(conn, daycare_id, age_years))?)
    }

    /// 机构各班组的名额明细
    pub fn group_availability(
        &self,
        daycare_id: &str,
        age_years: u32,
    ) -> ApiResult<Vec<GroupAvailability>> {
        require_non_empty("daycare_id", daycare_id)?;
        Ok(self
            .store
            .read(|conn| self.capacity.group_availability(conn, daycare_id, age_years))?)
    }

    /// 儿童的操作历史
    pub fn child_history(&self, child_id: &str) -> ApiResult<Vec<ActionLog>> {
        require_non_empty("child_id", child_id)?;
        Ok(self
            .store
            .read(|conn| ActionLogRepository::new(conn).find_by_child(child_id))?)
    }

    /// 最近的操作日志
    pub fn recent_actions(&self, limit: usize) -> ApiResult<Vec<ActionLog>> {
        Ok(self
            .store
            .read(|conn| ActionLogRepository::new(conn).find_recent(limit))?)
    }
}

fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}
