// ==========================================
// 成衣产线排产系统 - 看板汇总
// ==========================================
// 职责: 订单状态分布、近 30 天工序产量、产线平均效率、物料状态分布
// 红线: 只读聚合，不落库
// ==========================================

use crate::domain::line::ProductionLine;
use crate::domain::production::ProductionEntry;
use crate::domain::types::{MaterialStatus, OrderStatus, Process};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 工序产量统计窗口（天）
pub const PRODUCTION_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub today: NaiveDate,
    pub total_orders: usize,
    pub orders_by_status: BTreeMap<String, usize>,
    pub window_start: NaiveDate,
    pub process_totals: BTreeMap<Process, i64>,
    // line_name -> 平均效率（仅统计填写了效率的记录）
    pub line_efficiency: BTreeMap<String, f64>,
    pub materials_by_status: BTreeMap<String, i64>,
}

/// 统计窗口起始日（含 today，共 30 天）
pub fn window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(PRODUCTION_WINDOW_DAYS - 1)
}

/// 汇总看板数据
///
/// # 参数
/// - order_statuses: 每个订单的生效状态
/// - entries: 统计窗口内的生产记录
/// - lines: 全部产线（用于效率按名称展示）
/// - material_counts: 物料状态计数
pub fn summarize(
    today: NaiveDate,
    order_statuses: &[OrderStatus],
    entries: &[ProductionEntry],
    lines: &[ProductionLine],
    material_counts: &HashMap<MaterialStatus, i64>,
) -> DashboardSummary {
    let mut orders_by_status: BTreeMap<String, usize> = OrderStatus::ALL
        .iter()
        .map(|s| (s.to_string(), 0))
        .collect();
    for status in order_statuses {
        *orders_by_status.entry(status.to_string()).or_insert(0) += 1;
    }

    let mut process_totals: BTreeMap<Process, i64> =
        Process::PIPELINE.iter().map(|p| (*p, 0)).collect();
    let mut efficiency_acc: HashMap<&str, (f64, usize)> = HashMap::new();
    for entry in entries {
        *process_totals.entry(entry.process).or_insert(0) += entry.quantity;
        if let Some(eff) = entry.efficiency {
            let acc = efficiency_acc.entry(entry.line_id.as_str()).or_insert((0.0, 0));
            acc.0 += eff;
            acc.1 += 1;
        }
    }

    let line_efficiency = lines
        .iter()
        .filter_map(|line| {
            efficiency_acc
                .get(line.line_id.as_str())
                .map(|(sum, n)| (line.name.clone(), sum / *n as f64))
        })
        .collect();

    let materials_by_status = MaterialStatus::ALL
        .iter()
        .map(|s| (s.to_string(), material_counts.get(s).copied().unwrap_or(0)))
        .collect();

    DashboardSummary {
        today,
        total_orders: order_statuses.len(),
        orders_by_status,
        window_start: window_start(today),
        process_totals,
        line_efficiency,
        materials_by_status,
    }
}
