// ==========================================
// 托育候补名单系统 - 托育机构与班组领域模型
// ==========================================
// 红线: 容量为静态配置值,占用数永远由有效分配实时计数
// ==========================================

use crate::domain::types::Shift;
use serde::{Deserialize, Serialize};

// ==========================================
// Daycare - 托育机构
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Daycare {
    pub daycare_id: String,
    pub name: String,
    pub active: bool,
}

// ==========================================
// ClassGroup - 班组 (名额单元)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassGroup {
    pub group_id: String,
    pub daycare_id: String,
    pub name: String,
    pub min_age_years: u32, // 年龄下限 (含)
    pub max_age_years: u32, // 年龄上限 (含)
    pub shift: Shift,
    pub capacity: u32,      // 静态容量
    pub active: bool,
}

impl ClassGroup {
    /// 年龄是否落在 [min, max] 内
    pub fn accepts_age(&self, age_years: u32) -> bool {
        self.min_age_years <= age_years && age_years <= self.max_age_years
    }
}

// ==========================================
// GroupAvailability - 单班组可用名额
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAvailability {
    pub group_id: String,
    pub capacity: u32,
    pub occupied: u32,
}

impl GroupAvailability {
    /// 剩余名额 (不为负)
    pub fn available(&self) -> u32 {
        self.capacity.saturating_sub(self.occupied)
    }
}
