use super::*;

use crate::domain::criterion::{Criterion, CriterionRule};
use crate::domain::daycare::{ClassGroup, Daycare};
use crate::domain::types::ChildStatus;
use crate::engine::EngineError;
use crate::repository::{CriterionRepository, DaycareRepository};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// 种子数据 (JSON 导入)
// ==========================================

/// 种子儿童: 志愿按数组顺序确定顺位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedChild {
    pub child_id: String,
    pub name: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub profile: BTreeMap<String, FactValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub daycares: Vec<Daycare>,
    #[serde(default)]
    pub groups: Vec<ClassGroup>,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub children: Vec<SeedChild>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSummary {
    pub daycares: usize,
    pub groups: usize,
    pub criteria: usize,
    pub children: usize,
}

impl WaitlistApi {
    // ==========================================
    // 目录维护接口
    // ==========================================

    pub fn add_daycare(&self, daycare: &Daycare) -> ApiResult<()> {
        require_non_empty("daycare_id", &daycare.daycare_id)?;
        self.store
            .in_transaction(|tx| DaycareRepository::new(tx).insert_daycare(daycare))?;
        tracing::info!("新增托育机构: daycare_id={}", daycare.daycare_id);
        Ok(())
    }

    pub fn set_daycare_active(&self, daycare_id: &str, active: bool) -> ApiResult<()> {
        require_non_empty("daycare_id", daycare_id)?;
        self.store
            .in_transaction(|tx| DaycareRepository::new(tx).set_daycare_active(daycare_id, active))?;
        Ok(())
    }

    pub fn add_group(&self, group: &ClassGroup) -> ApiResult<()> {
        validate_group(group)?;
        self.store
            .in_transaction(|tx| DaycareRepository::new(tx).insert_group(group))?;
        tracing::info!(
            "新增班组: group_id={}, daycare_id={}, capacity={}",
            group.group_id,
            group.daycare_id,
            group.capacity
        );
        Ok(())
    }

    /// 调整班组容量
    ///
    /// 容量可低于当前占用数; 此时可用名额为 0,已有分配不受影响
    pub fn update_group_capacity(&self, group_id: &str, capacity: u32) -> ApiResult<()> {
        require_non_empty("group_id", group_id)?;
        self.store
            .in_transaction(|tx| DaycareRepository::new(tx).update_group_capacity(group_id, capacity))?;
        Ok(())
    }

    /// 启用/停用班组; 停用班组不再提供名额,已有分配不受影响
    pub fn set_group_active(&self, group_id: &str, active: bool) -> ApiResult<()> {
        require_non_empty("group_id", group_id)?;
        self.store
            .in_transaction(|tx| DaycareRepository::new(tx).set_group_active(group_id, active))?;
        Ok(())
    }

    pub fn add_criterion(&self, criterion: &Criterion) -> ApiResult<()> {
        validate_criterion(criterion)?;
        self.store
            .in_transaction(|tx| CriterionRepository::new(tx).insert(criterion))?;
        tracing::info!(
            "新增评分标准: criterion_id={}, weight={}",
            criterion.criterion_id,
            criterion.weight
        );
        Ok(())
    }

    /// 启用/停用评分标准
    ///
    /// 已有条目的分数不自动重算,需调用 recompute_score 或带重算选项的匹配轮次
    pub fn set_criterion_active(&self, criterion_id: &str, active: bool) -> ApiResult<()> {
        require_non_empty("criterion_id", criterion_id)?;
        self.store
            .in_transaction(|tx| CriterionRepository::new(tx).set_active(criterion_id, active))?;
        Ok(())
    }

    pub fn update_criterion_weight(&self, criterion_id: &str, weight: u32) -> ApiResult<()> {
        require_non_empty("criterion_id", criterion_id)?;
        if weight == 0 {
            return Err(ApiError::InvalidInput("权重必须为正整数".to_string()));
        }
        self.store
            .in_transaction(|tx| CriterionRepository::new(tx).update_weight(criterion_id, weight))?;
        Ok(())
    }

    pub fn list_criteria(&self) -> ApiResult<Vec<Criterion>> {
        Ok(self
            .store
            .read(|conn| CriterionRepository::new(conn).find_all())?)
    }

    // ==========================================
    // 种子导入
    // ==========================================

    /// 导入种子数据 (单个事务,任一失败整体回滚)
    ///
    /// 儿童以 WAITING 状态登记并直接进入候补
    pub fn import_seed(&self, seed: &SeedData, actor: &str) -> ApiResult<SeedSummary> {
        require_non_empty("actor", actor)?;
        for group in &seed.groups {
            validate_group(group)?;
        }
        for criterion in &seed.criteria {
            validate_criterion(criterion)?;
        }

        let max_preferences = self.config_manager.get_max_preferences()?;
        let now = self.clock.now();
        let children: Vec<Child> = seed
            .children
            .iter()
            .map(|c| Child {
                child_id: c.child_id.clone(),
                name: c.name.clone(),
                birth_date: c.birth_date,
                status: ChildStatus::Waiting,
                preferences: c
                    .preferences
                    .iter()
                    .enumerate()
                    .map(|(idx, daycare_id)| DaycarePreference {
                        rank: u8::try_from(idx + 1).unwrap_or(u8::MAX),
                        daycare_id: daycare_id.clone(),
                    })
                    .collect(),
                profile: c.profile.clone(),
                created_at: now,
                updated_at: now,
            })
            .collect();

        let summary = self.store.in_transaction(|tx| -> Result<SeedSummary, EngineError> {
            let daycare_repo = DaycareRepository::new(tx);
            for daycare in &seed.daycares {
                daycare_repo.insert_daycare(daycare)?;
            }
            for group in &seed.groups {
                daycare_repo.insert_group(group)?;
            }
            let criterion_repo = CriterionRepository::new(tx);
            for criterion in &seed.criteria {
                criterion_repo.insert(criterion)?;
            }
            let child_repo = ChildRepository::new(tx);
            for child in &children {
                child_repo.insert(child)?;
                self.waitlist
                    .enqueue_in(tx, &child.child_id, actor, max_preferences, now)?;
            }

            Ok(SeedSummary {
                daycares: seed.daycares.len(),
                groups: seed.groups.len(),
                criteria: seed.criteria.len(),
                children: children.len(),
            })
        })?;

        tracing::info!(
            "种子数据导入完成: daycares={}, groups={}, criteria={}, children={}",
            summary.daycares,
            summary.groups,
            summary.criteria,
            summary.children
        );
        Ok(summary)
    }
}

fn validate_group(group: &ClassGroup) -> ApiResult<()> {
    require_non_empty("group_id", &group.group_id)?;
    require_non_empty("daycare_id", &group.daycare_id)?;
    if group.min_age_years > group.max_age_years {
        return Err(ApiError::InvalidInput(format!(
            "班组年龄范围无效: group_id={}, {}..{}",
            group.group_id, group.min_age_years, group.max_age_years
        )));
    }
    Ok(())
}

fn validate_criterion(criterion: &Criterion) -> ApiResult<()> {
    require_non_empty("criterion_id", &criterion.criterion_id)?;
    if criterion.weight == 0 {
        return Err(ApiError::InvalidInput(format!(
            "权重必须为正整数: criterion_id={}",
            criterion.criterion_id
        )));
    }
    match &criterion.rule {
        CriterionRule::Numeric { threshold, .. } if !threshold.is_finite() => {
            Err(ApiError::InvalidInput(format!(
                "数值阈值无效: criterion_id={}",
                criterion.criterion_id
            )))
        }
        CriterionRule::Enumerated { accepted, .. } if accepted.is_empty() => {
            Err(ApiError::InvalidInput(format!(
                "枚举标准缺少可接受取值: criterion_id={}",
                criterion.criterion_id
            )))
        }
        _ => Ok(()),
    }
}
