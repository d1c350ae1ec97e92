// ==========================================
// 成衣产线排产系统 - 产线与产线分配领域模型
// ==========================================
// 红线: capacity > 0
// 红线: end_date >= start_date, planned_quantity > 0
// 区间语义: 闭区间 [start_date, end_date]，首尾两天都计入
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionLine - 产线
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionLine {
    pub line_id: String,
    pub name: String,          // 唯一
    pub capacity: i64,         // 件/天
    pub active: bool,
    pub supervisor: Option<String>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// LineAllocation - 产线分配
// ==========================================
// 用途: 将款式在某日期区间内排到某条产线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAllocation {
    pub allocation_id: String,
    pub line_id: String,
    pub style_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub planned_quantity: i64,
    pub remarks: Option<String>,
    pub created_at: NaiveDateTime,
}

impl LineAllocation {
    /// 闭区间天数（含首尾）
    pub fn inclusive_days(&self) -> i64 {
        inclusive_days(self.start_date, self.end_date)
    }

    /// 指定日期是否处于分配区间内
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// 与给定闭区间是否重叠
    ///
    /// 判定: s1 <= e2 AND e1 >= s2（边界日相接即视为重叠）
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        intervals_overlap(self.start_date, self.end_date, start, end)
    }

    /// 摊销到每天的计划件数
    pub fn daily_units(&self) -> f64 {
        let days = self.inclusive_days();
        if days <= 0 {
            return 0.0;
        }
        self.planned_quantity as f64 / days as f64
    }
}

/// 闭区间天数
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// 闭区间重叠判定
pub fn intervals_overlap(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 <= e2 && e1 >= s2
}

/// 分配请求（新建/修改共用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub line_id: String,
    pub style_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub planned_quantity: i64,
    pub remarks: Option<String>,
}

/// 分配结果（含非阻断提示）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub allocation: LineAllocation,

    // 与本分配重叠的同产线分配ID（仅提示）
    pub overlaps: Vec<String>,

    // 摊销日产量是否超过产线产能（仅提示）
    pub exceeds_capacity: bool,
}

impl AllocationOutcome {
    pub fn has_overlap(&self) -> bool {
        !self.overlaps.is_empty()
    }
}
