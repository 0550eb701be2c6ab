// ==========================================
// 托育候补名单系统 - 名额容量查询引擎
// ==========================================
// 职责: 班组目录 + 当前有效分配 → 可用名额
// 红线: 只读; 占用数实时计数,不缓存
// 红线: 同一匹配轮次内必须逐个儿童重新查询
// ==========================================

use crate::domain::daycare::GroupAvailability;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::{AllocationRepository, DaycareRepository};
use rusqlite::Connection;

// ==========================================
// CapacityTracker - 名额容量查询引擎
// ==========================================
#[derive(Debug, Default, Clone)]
pub struct CapacityTracker {
    // 无状态引擎,连接由调用方提供 (可为进行中的事务)
}

impl CapacityTracker {
    pub fn new() -> Self {
        Self {}
    }

    /// 机构对指定年龄的可用名额
    ///
    /// = Σ(年龄适配的启用班组容量) - Σ(这些班组的 ACTIVE 分配数), 下限 0
    ///
    /// # 返回
    /// - Ok(n): 可用名额 (停用机构为 0)
    /// - Err(NotFound): 机构不存在
    pub fn available_capacity(
        &self,
        conn: &Connection,
        daycare_id: &str,
        age_years: u32,
    ) -> EngineResult<u32> {
        let groups = self.group_availability(conn, daycare_id, age_years)?;

        let capacity: u32 = groups.iter().map(|g| g.capacity).sum();
        let occupied: u32 = groups.iter().map(|g| g.occupied).sum();
        Ok(capacity.saturating_sub(occupied))
    }

    /// 年龄适配的启用班组明细
    ///
    /// 顺序: min_age_years, group_id
    pub fn group_availability(
        &self,
        conn: &Connection,
        daycare_id: &str,
        age_years: u32,
    ) -> EngineResult<Vec<GroupAvailability>> {
        let daycare_repo = DaycareRepository::new(conn);
        let allocation_repo = AllocationRepository::new(conn);

        let daycare = daycare_repo
            .find_daycare(daycare_id)?
            .ok_or_else(|| EngineError::not_found("Daycare", daycare_id))?;
        if !daycare.active {
            return Ok(Vec::new());
        }

        let mut result = Vec::new();
        for group in daycare_repo.find_groups_by_daycare(daycare_id)? {
            if !group.active || !group.accepts_age(age_years) {
                continue;
            }
            let occupied = allocation_repo.count_active_by_group(&group.group_id)?;
            result.push(GroupAvailability {
                group_id: group.group_id,
                capacity: group.capacity,
                occupied,
            });
        }
        Ok(result)
    }

    /// 挑选入托班组: 第一个仍有空位的适配班组
    pub fn pick_group(
        &self,
        conn: &Connection,
        daycare_id: &str,
        age_years: u32,
    ) -> EngineResult<Option<GroupAvailability>> {
        Ok(self
            .group_availability(conn, daycare_id, age_years)?
            .into_iter()
            .find(|g| g.available() > 0))
    }
}
