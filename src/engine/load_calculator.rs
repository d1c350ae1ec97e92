// ==========================================
// 成衣产线排产系统 - 产线负荷计算引擎
// ==========================================
// 职责: 由分配与产线产能推导 每产线/每日 负荷百分比
// 红线: 纯读侧投影，不缓存，每次按当前分配集合重算
// 公式: daily_units = planned_quantity / 闭区间天数
//       load% = Σ daily_units(当日生效分配) / capacity × 100
// ==========================================

use crate::config::PlanningConfigReader;
use crate::domain::line::{LineAllocation, ProductionLine};
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::{LineAllocationRepository, ProductionLineRepository};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

// ==========================================
// 纯函数
// ==========================================

/// 分配摊销到每天的件数
pub fn daily_units(allocation: &LineAllocation) -> f64 {
    allocation.daily_units()
}

/// 单日负荷百分比
///
/// 无生效分配时为 0；可超过 100（超负荷）
pub fn daily_load_pct(capacity: i64, allocations: &[LineAllocation], date: NaiveDate) -> f64 {
    if capacity <= 0 {
        return 0.0;
    }
    let units: f64 = allocations
        .iter()
        .filter(|a| a.is_active_on(date))
        .map(daily_units)
        .sum();
    units / capacity as f64 * 100.0
}

/// 区间内逐日负荷百分比（闭区间，每个自然日一项）
pub fn range_load_pct(
    capacity: i64,
    allocations: &[LineAllocation],
    start: NaiveDate,
    end: NaiveDate,
) -> EngineResult<BTreeMap<NaiveDate, f64>> {
    if end < start {
        return Err(EngineError::InvalidRange { start, end });
    }
    Ok(start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|d| (d, daily_load_pct(capacity, allocations, d)))
        .collect())
}

/// 单条产线的区间负荷（负荷矩阵的一行）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineLoadRow {
    pub line_id: String,
    pub line_name: String,
    pub capacity: i64,
    pub daily: BTreeMap<NaiveDate, f64>,
}

// ==========================================
// LoadCalculator - 负荷计算服务
// ==========================================
pub struct LoadCalculator {
    line_repo: Arc<ProductionLineRepository>,
    allocation_repo: Arc<LineAllocationRepository>,
    config: Arc<dyn PlanningConfigReader>,
}

impl LoadCalculator {
    pub fn new(
        line_repo: Arc<ProductionLineRepository>,
        allocation_repo: Arc<LineAllocationRepository>,
        config: Arc<dyn PlanningConfigReader>,
    ) -> Self {
        Self {
            line_repo,
            allocation_repo,
            config,
        }
    }

    fn require_line(&self, line_id: &str) -> EngineResult<ProductionLine> {
        self.line_repo
            .find_by_id(line_id)?
            .ok_or_else(|| EngineError::not_found("ProductionLine", line_id))
    }

    /// 产线单日负荷百分比
    pub fn daily_load(&self, line_id: &str, date: NaiveDate) -> EngineResult<f64> {
        let line = self.require_line(line_id)?;
        let allocations = self
            .allocation_repo
            .find_overlapping(line_id, date, date, None)?;
        Ok(daily_load_pct(line.capacity, &allocations, date))
    }

    /// 产线区间逐日负荷百分比
    pub fn range_load(
        &self,
        line_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<BTreeMap<NaiveDate, f64>> {
        if end < start {
            return Err(EngineError::InvalidRange { start, end });
        }
        let line = self.require_line(line_id)?;
        let allocations = self
            .allocation_repo
            .find_overlapping(line_id, start, end, None)?;
        range_load_pct(line.capacity, &allocations, start, end)
    }

    /// 全部启用产线的区间负荷矩阵
    pub fn load_matrix(&self, start: NaiveDate, end: NaiveDate) -> EngineResult<Vec<LineLoadRow>> {
        if end < start {
            return Err(EngineError::InvalidRange { start, end });
        }
        let lines = self.line_repo.list_active()?;
        let allocations = self.allocation_repo.find_in_range(start, end)?;

        let mut by_line: BTreeMap<&str, Vec<LineAllocation>> = BTreeMap::new();
        for allocation in &allocations {
            by_line
                .entry(allocation.line_id.as_str())
                .or_default()
                .push(allocation.clone());
        }

        let mut rows = Vec::with_capacity(lines.len());
        for line in lines {
            let line_allocations = by_line
                .get(line.line_id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let daily = range_load_pct(line.capacity, line_allocations, start, end)?;
            rows.push(LineLoadRow {
                line_id: line.line_id,
                line_name: line.name,
                capacity: line.capacity,
                daily,
            });
        }

        debug!(lines = rows.len(), start = %start, end = %end, "负荷矩阵已计算");
        Ok(rows)
    }

    /// 超过配置阈值的日期及负荷
    pub fn overloaded_days(
        &self,
        line_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<Vec<(NaiveDate, f64)>> {
        let threshold = self.config.overload_threshold_pct()?;
        Ok(self
            .range_load(line_id, start, end)?
            .into_iter()
            .filter(|(_, pct)| *pct > threshold)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn alloc(start: NaiveDate, end: NaiveDate, qty: i64) -> LineAllocation {
        LineAllocation {
            allocation_id: format!("A-{}-{}", start, qty),
            line_id: "L1".to_string(),
            style_id: "S".to_string(),
            start_date: start,
            end_date: end,
            planned_quantity: qty,
            remarks: None,
            created_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_no_allocation_is_zero() {
        assert_eq!(daily_load_pct(300, &[], d(2024, 1, 1)), 0.0);
    }

    #[test]
    fn test_single_allocation_amortized() {
        let allocations = vec![alloc(d(2024, 1, 1), d(2024, 1, 3), 900)];
        assert!((daily_load_pct(300, &allocations, d(2024, 1, 2)) - 100.0).abs() < 1e-9);
        assert_eq!(daily_load_pct(300, &allocations, d(2024, 1, 4)), 0.0);
    }

    #[test]
    fn test_overlapping_allocations_sum_beyond_capacity() {
        let allocations = vec![
            alloc(d(2024, 1, 1), d(2024, 1, 3), 900),
            alloc(d(2024, 1, 2), d(2024, 1, 2), 300),
        ];
        assert!((daily_load_pct(300, &allocations, d(2024, 1, 2)) - 200.0).abs() < 1e-9);
        assert!((daily_load_pct(300, &allocations, d(2024, 1, 3)) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_amortization_round_trip() {
        // q=700, n=7, c=250: 每日 (q/n)/c×100，n 天求和恢复 q/c×100
        let (q, c) = (700, 250);
        let allocations = vec![alloc(d(2024, 3, 1), d(2024, 3, 7), q)];
        let loads = range_load_pct(c, &allocations, d(2024, 3, 1), d(2024, 3, 7)).unwrap();
        assert_eq!(loads.len(), 7);
        for pct in loads.values() {
            assert!((pct - (q as f64 / 7.0) / c as f64 * 100.0).abs() < 1e-9);
        }
        let total: f64 = loads.values().sum();
        assert!((total - q as f64 / c as f64 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_range_rejects_reversed() {
        let err = range_load_pct(100, &[], d(2024, 1, 2), d(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRange { .. }));
    }
}
