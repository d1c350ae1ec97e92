// ==========================================
// 成衣产线排产系统 - 生产记录领域模型
// ==========================================
// 红线: ProductionEntry 只追加，不修改，仅做聚合
// WIP 为读时派生值，不落库
// ==========================================

use crate::domain::types::{OrderStatus, Process, StyleStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// ProductionEntry - 生产日报记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionEntry {
    pub entry_id: String,
    pub date: NaiveDate,
    pub style_id: String,
    pub line_id: String,
    pub process: Process,
    pub quantity: i64,
    pub efficiency: Option<f64>, // 百分比 [0, 100]
    pub defects: i64,
    pub delay_reason: Option<String>,
    pub remarks: Option<String>,
    pub created_at: NaiveDateTime,
}

/// 新增生产记录参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProductionEntry {
    pub date: NaiveDate,
    pub style_id: String,
    pub line_id: String,
    pub process: Process,
    pub quantity: i64,
    pub efficiency: Option<f64>,
    pub defects: i64,
    pub delay_reason: Option<String>,
    pub remarks: Option<String>,
}

impl NewProductionEntry {
    pub fn validate(&self) -> Result<(), String> {
        if self.quantity < 0 {
            return Err(format!("生产数量不能为负: {}", self.quantity));
        }
        if self.defects < 0 {
            return Err(format!("次品数不能为负: {}", self.defects));
        }
        if let Some(eff) = self.efficiency {
            if !(0.0..=100.0).contains(&eff) {
                return Err(format!("效率必须在 [0, 100] 之间: {}", eff));
            }
        }
        Ok(())
    }
}

// ==========================================
// ProcessTotals - 各工序累计件数
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessTotals {
    pub totals: BTreeMap<Process, i64>,
}

impl ProcessTotals {
    pub fn get(&self, process: Process) -> i64 {
        self.totals.get(&process).copied().unwrap_or(0)
    }

    pub fn add(&mut self, process: Process, quantity: i64) {
        *self.totals.entry(process).or_insert(0) += quantity;
    }

    /// 是否已有任何产出
    pub fn has_any_output(&self) -> bool {
        self.totals.values().any(|q| *q > 0)
    }
}

impl FromIterator<(Process, i64)> for ProcessTotals {
    fn from_iter<T: IntoIterator<Item = (Process, i64)>>(iter: T) -> Self {
        let mut totals = ProcessTotals::default();
        for (process, quantity) in iter {
            totals.add(process, quantity);
        }
        totals
    }
}

// ==========================================
// 进度视图（读时派生）
// ==========================================

/// 款式进度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleProgress {
    pub style_id: String,
    pub style_number: String,
    pub quantity: i64,
    pub totals: ProcessTotals,

    // 相邻工序之间的在制品（Dispatch 无下游，不计）
    pub wip: BTreeMap<Process, i64>,

    // 各工序完成率（相对款式数量，百分比）
    pub completion_pct: BTreeMap<Process, f64>,

    pub derived_status: StyleStatus,
    pub manual_status: Option<StyleStatus>,
    pub effective_status: StyleStatus,
}

/// 订单进度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderProgress {
    pub order_id: String,
    pub po_number: String,
    pub total_quantity: i64,
    pub dispatched_quantity: i64,
    pub completion_pct: f64,
    pub styles: Vec<StyleProgress>,
    pub derived_status: OrderStatus,
    pub manual_status: Option<OrderStatus>,
    pub effective_status: OrderStatus,
}
